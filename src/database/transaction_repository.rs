use crate::database::error::DatabaseError;
use crate::database::types::{TransactionStatus, TransactionType};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

const TX_COLUMNS: &str = "id, user_id, wallet_id, type, status, chain_id, chain_name, \
     token_symbol, token_address, raw_amount, amount_credits, tx_hash, from_address, \
     to_address, external_transfer_id, confirmations, error_message, webhook_payload, \
     created_at, processed_at";

/// A movement of tokens through custody, either direction.
///
/// `raw_amount` is the base-unit token amount as a decimal string, exactly
/// as custody reported it. `amount_credits` is the truncated credit value
/// actually applied to the balance.
#[derive(Debug, Clone, FromRow)]
pub struct CryptoTransaction {
    pub id: Uuid,
    pub user_id: i64,
    pub wallet_id: Option<Uuid>,
    pub r#type: TransactionType,
    pub status: TransactionStatus,
    pub chain_id: i64,
    pub chain_name: String,
    pub token_symbol: String,
    pub token_address: String,
    pub raw_amount: String,
    pub amount_credits: i64,
    pub tx_hash: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub external_transfer_id: String,
    pub confirmations: i32,
    pub error_message: Option<String>,
    pub webhook_payload: Option<serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Fields for a new deposit row, recorded when a confirmed inbound
/// transfer event is credited.
pub struct NewDeposit<'a> {
    pub user_id: i64,
    pub wallet_id: Uuid,
    pub chain_id: i64,
    pub chain_name: &'a str,
    pub token_symbol: &'a str,
    pub token_address: &'a str,
    pub raw_amount: &'a str,
    pub amount_credits: i64,
    pub tx_hash: &'a str,
    pub from_address: Option<&'a str>,
    pub to_address: &'a str,
    pub external_transfer_id: &'a str,
    pub confirmations: i32,
    pub webhook_payload: serde_json::Value,
}

/// Fields for a new withdrawal row, recorded once custody accepts the
/// outbound transfer.
pub struct NewWithdrawal<'a> {
    pub user_id: i64,
    pub wallet_id: Uuid,
    pub chain_id: i64,
    pub chain_name: &'a str,
    pub token_symbol: &'a str,
    pub token_address: &'a str,
    pub raw_amount: &'a str,
    pub amount_credits: i64,
    pub to_address: &'a str,
    pub external_transfer_id: &'a str,
}

/// Repository for crypto transactions
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a credited deposit. The partial unique index on tx_hash makes
    /// replayed webhook deliveries fail here with a unique violation, which
    /// rolls the enclosing transaction (and its balance credit) back.
    pub async fn insert_deposit(
        &self,
        conn: &mut PgConnection,
        deposit: NewDeposit<'_>,
    ) -> Result<CryptoTransaction, DatabaseError> {
        sqlx::query_as::<_, CryptoTransaction>(&format!(
            "INSERT INTO crypto_transactions
             (user_id, wallet_id, type, status, chain_id, chain_name, token_symbol,
              token_address, raw_amount, amount_credits, tx_hash, from_address,
              to_address, external_transfer_id, confirmations, webhook_payload,
              processed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                     $15, $16, now())
             RETURNING {TX_COLUMNS}",
        ))
        .bind(deposit.user_id)
        .bind(deposit.wallet_id)
        .bind(TransactionType::Deposit)
        .bind(TransactionStatus::Completed)
        .bind(deposit.chain_id)
        .bind(deposit.chain_name)
        .bind(deposit.token_symbol)
        .bind(deposit.token_address)
        .bind(deposit.raw_amount)
        .bind(deposit.amount_credits)
        .bind(deposit.tx_hash)
        .bind(deposit.from_address)
        .bind(deposit.to_address)
        .bind(deposit.external_transfer_id)
        .bind(deposit.confirmations)
        .bind(deposit.webhook_payload)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Record an approved withdrawal that custody has accepted but not yet
    /// settled.
    pub async fn insert_withdrawal(
        &self,
        conn: &mut PgConnection,
        withdrawal: NewWithdrawal<'_>,
    ) -> Result<CryptoTransaction, DatabaseError> {
        sqlx::query_as::<_, CryptoTransaction>(&format!(
            "INSERT INTO crypto_transactions
             (user_id, wallet_id, type, status, chain_id, chain_name, token_symbol,
              token_address, raw_amount, amount_credits, to_address,
              external_transfer_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {TX_COLUMNS}",
        ))
        .bind(withdrawal.user_id)
        .bind(withdrawal.wallet_id)
        .bind(TransactionType::Withdrawal)
        .bind(TransactionStatus::Approved)
        .bind(withdrawal.chain_id)
        .bind(withdrawal.chain_name)
        .bind(withdrawal.token_symbol)
        .bind(withdrawal.token_address)
        .bind(withdrawal.raw_amount)
        .bind(withdrawal.amount_credits)
        .bind(withdrawal.to_address)
        .bind(withdrawal.external_transfer_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CryptoTransaction>, DatabaseError> {
        sqlx::query_as::<_, CryptoTransaction>(&format!(
            "SELECT {TX_COLUMNS} FROM crypto_transactions WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn find_by_external_transfer_id(
        &self,
        external_transfer_id: &str,
    ) -> Result<Option<CryptoTransaction>, DatabaseError> {
        sqlx::query_as::<_, CryptoTransaction>(&format!(
            "SELECT {TX_COLUMNS} FROM crypto_transactions WHERE external_transfer_id = $1",
        ))
        .bind(external_transfer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn mark_completed(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        tx_hash: Option<&str>,
    ) -> Result<CryptoTransaction, DatabaseError> {
        sqlx::query_as::<_, CryptoTransaction>(&format!(
            "UPDATE crypto_transactions
             SET status = $2, tx_hash = COALESCE($3, tx_hash), processed_at = now()
             WHERE id = $1
             RETURNING {TX_COLUMNS}",
        ))
        .bind(id)
        .bind(TransactionStatus::Completed)
        .bind(tx_hash)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn mark_failed(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        error_message: &str,
    ) -> Result<CryptoTransaction, DatabaseError> {
        sqlx::query_as::<_, CryptoTransaction>(&format!(
            "UPDATE crypto_transactions
             SET status = $2, error_message = $3, processed_at = now()
             WHERE id = $1
             RETURNING {TX_COLUMNS}",
        ))
        .bind(id)
        .bind(TransactionStatus::Failed)
        .bind(error_message)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Newest-first page of a user's deposit and withdrawal history.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CryptoTransaction>, DatabaseError> {
        sqlx::query_as::<_, CryptoTransaction>(&format!(
            "SELECT {TX_COLUMNS} FROM crypto_transactions
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
