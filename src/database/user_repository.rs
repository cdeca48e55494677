use crate::database::error::DatabaseError;
use sqlx::{FromRow, PgConnection, PgPool};

/// Platform user holding a credit balance
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub account_balance: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Repository for users and their credit balances
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, DatabaseError> {
        sqlx::query_as::<_, User>(
            "SELECT user_id, username, account_balance, created_at
             FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Insert a user if missing. Existing rows are left untouched.
    pub async fn ensure_exists(&self, user_id: i64, username: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO users (user_id, username) VALUES ($1, $2)
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(username)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }

    /// Lock the user row for the rest of the enclosing transaction.
    ///
    /// Serializes concurrent balance mutations for the same user: the
    /// balance read after this call cannot go stale before commit.
    pub async fn lock_by_id(
        &self,
        conn: &mut PgConnection,
        user_id: i64,
    ) -> Result<Option<User>, DatabaseError> {
        sqlx::query_as::<_, User>(
            "SELECT user_id, username, account_balance, created_at
             FROM users WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Debit credits, guarded so the balance can never go negative.
    /// Returns the new balance, or None if funds were insufficient.
    pub async fn debit_credits(
        &self,
        conn: &mut PgConnection,
        user_id: i64,
        amount: i64,
    ) -> Result<Option<i64>, DatabaseError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "UPDATE users SET account_balance = account_balance - $2
             WHERE user_id = $1 AND account_balance >= $2
             RETURNING account_balance",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(row.map(|(balance,)| balance))
    }

    /// Credit credits and return the new balance.
    pub async fn credit_credits(
        &self,
        conn: &mut PgConnection,
        user_id: i64,
        amount: i64,
    ) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as(
            "UPDATE users SET account_balance = account_balance + $2
             WHERE user_id = $1
             RETURNING account_balance",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(row.0)
    }
}
