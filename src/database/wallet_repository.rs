use crate::database::error::DatabaseError;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const WALLET_COLUMNS: &str =
    "id, user_id, custody_wallet_id, chain_id, chain_name, address, is_active, created_at";

/// An MPC deposit wallet provisioned for a user on one chain
#[derive(Debug, Clone, FromRow)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: i64,
    pub custody_wallet_id: String,
    pub chain_id: i64,
    pub chain_name: String,
    pub address: String,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Repository for custody-backed deposit wallets
pub struct WalletRepository {
    pool: PgPool,
}

impl WalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a freshly provisioned wallet. A partial unique index keeps at
    /// most one active wallet per (user, chain); a concurrent provision for
    /// the same pair surfaces as a unique violation.
    pub async fn create(
        &self,
        user_id: i64,
        custody_wallet_id: &str,
        chain_id: i64,
        chain_name: &str,
        address: &str,
    ) -> Result<Wallet, DatabaseError> {
        sqlx::query_as::<_, Wallet>(&format!(
            "INSERT INTO wallets (user_id, custody_wallet_id, chain_id, chain_name, address)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {WALLET_COLUMNS}",
        ))
        .bind(user_id)
        .bind(custody_wallet_id)
        .bind(chain_id)
        .bind(chain_name)
        .bind(address)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn find_active(
        &self,
        user_id: i64,
        chain_id: i64,
    ) -> Result<Option<Wallet>, DatabaseError> {
        sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets
             WHERE user_id = $1 AND chain_id = $2 AND is_active",
        ))
        .bind(user_id)
        .bind(chain_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Resolve the owner of an inbound transfer. Webhook events identify
    /// the deposit wallet by its custody-side id.
    pub async fn find_by_custody_wallet_id(
        &self,
        custody_wallet_id: &str,
    ) -> Result<Option<Wallet>, DatabaseError> {
        sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE custody_wallet_id = $1",
        ))
        .bind(custody_wallet_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Wallet>, DatabaseError> {
        sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets
             WHERE user_id = $1 AND is_active ORDER BY chain_id",
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
