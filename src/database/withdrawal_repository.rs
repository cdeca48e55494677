use crate::database::error::DatabaseError;
use crate::database::types::WithdrawalStatus;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

const WITHDRAWAL_COLUMNS: &str = "id, user_id, chain_id, chain_name, token_symbol, \
     amount_credits, to_address, status, transaction_id, admin_id, admin_note, \
     error_message, created_at, processed_at";

/// A user's request to move credits out to an on-chain address
#[derive(Debug, Clone, FromRow)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub user_id: i64,
    pub chain_id: i64,
    pub chain_name: String,
    pub token_symbol: String,
    pub amount_credits: i64,
    pub to_address: String,
    pub status: WithdrawalStatus,
    pub transaction_id: Option<Uuid>,
    pub admin_id: Option<i64>,
    pub admin_note: String,
    pub error_message: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Counts and totals per withdrawal status, for the admin dashboard
#[derive(Debug, Clone, FromRow)]
pub struct WithdrawalStats {
    pub pending_count: i64,
    pub approved_count: i64,
    pub completed_count: i64,
    pub rejected_count: i64,
    pub failed_count: i64,
    pub pending_credits: i64,
    pub completed_credits: i64,
}

/// Repository for withdrawal requests
pub struct WithdrawalRepository {
    pool: PgPool,
}

impl WithdrawalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new PENDING request. Runs inside the initiation transaction
    /// so the row only exists if the balance debit committed.
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        user_id: i64,
        chain_id: i64,
        chain_name: &str,
        token_symbol: &str,
        amount_credits: i64,
        to_address: &str,
    ) -> Result<WithdrawalRequest, DatabaseError> {
        sqlx::query_as::<_, WithdrawalRequest>(&format!(
            "INSERT INTO withdrawal_requests
             (user_id, chain_id, chain_name, token_symbol, amount_credits, to_address)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {WITHDRAWAL_COLUMNS}",
        ))
        .bind(user_id)
        .bind(chain_id)
        .bind(chain_name)
        .bind(token_symbol)
        .bind(amount_credits)
        .bind(to_address)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<WithdrawalRequest>, DatabaseError> {
        sqlx::query_as::<_, WithdrawalRequest>(&format!(
            "SELECT {WITHDRAWAL_COLUMNS} FROM withdrawal_requests WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Lock the request row for the rest of the enclosing transaction.
    /// Concurrent admin actions on the same request queue up here.
    pub async fn lock_by_id(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<WithdrawalRequest>, DatabaseError> {
        sqlx::query_as::<_, WithdrawalRequest>(&format!(
            "SELECT {WITHDRAWAL_COLUMNS} FROM withdrawal_requests WHERE id = $1 FOR UPDATE",
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Move a locked request to APPROVED, linking the custody transaction.
    pub async fn mark_approved(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        admin_id: i64,
        admin_note: &str,
        transaction_id: Uuid,
    ) -> Result<WithdrawalRequest, DatabaseError> {
        sqlx::query_as::<_, WithdrawalRequest>(&format!(
            "UPDATE withdrawal_requests
             SET status = $2, admin_id = $3, admin_note = $4, transaction_id = $5,
                 processed_at = now()
             WHERE id = $1
             RETURNING {WITHDRAWAL_COLUMNS}",
        ))
        .bind(id)
        .bind(WithdrawalStatus::Approved)
        .bind(admin_id)
        .bind(admin_note)
        .bind(transaction_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Move a locked request to REJECTED, recording the reason. The refund
    /// is applied in the same transaction by the caller.
    pub async fn mark_rejected(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        admin_id: i64,
        reason: &str,
    ) -> Result<WithdrawalRequest, DatabaseError> {
        sqlx::query_as::<_, WithdrawalRequest>(&format!(
            "UPDATE withdrawal_requests
             SET status = $2, admin_id = $3, admin_note = $4, error_message = $4,
                 processed_at = now()
             WHERE id = $1
             RETURNING {WITHDRAWAL_COLUMNS}",
        ))
        .bind(id)
        .bind(WithdrawalStatus::Rejected)
        .bind(admin_id)
        .bind(reason)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Claim the APPROVED request linked to a ledger transaction, moving it
    /// straight to its terminal status. The status guard makes settlement
    /// idempotent: the first outcome event wins and replays see no row.
    pub async fn claim_approved_by_transaction(
        &self,
        conn: &mut PgConnection,
        transaction_id: Uuid,
        terminal: WithdrawalStatus,
        error_message: &str,
    ) -> Result<Option<WithdrawalRequest>, DatabaseError> {
        sqlx::query_as::<_, WithdrawalRequest>(&format!(
            "UPDATE withdrawal_requests
             SET status = $2, error_message = $3, processed_at = now()
             WHERE transaction_id = $1 AND status = $4
             RETURNING {WITHDRAWAL_COLUMNS}",
        ))
        .bind(transaction_id)
        .bind(terminal)
        .bind(error_message)
        .bind(WithdrawalStatus::Approved)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Credits committed to withdrawals since the start of the current UTC
    /// day. Only REJECTED requests are excluded: a FAILED request still
    /// consumed an approval slot that day even though it was refunded.
    pub async fn daily_withdrawn_credits(
        &self,
        conn: &mut PgConnection,
        user_id: i64,
    ) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount_credits), 0)::BIGINT
             FROM withdrawal_requests
             WHERE user_id = $1
               AND status <> 'REJECTED'
               AND created_at >= date_trunc('day', now() AT TIME ZONE 'UTC') AT TIME ZONE 'UTC'",
        )
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(row.0)
    }

    pub async fn list_for_user(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WithdrawalRequest>, DatabaseError> {
        sqlx::query_as::<_, WithdrawalRequest>(&format!(
            "SELECT {WITHDRAWAL_COLUMNS} FROM withdrawal_requests
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

    pub async fn stats_by_status(&self) -> Result<WithdrawalStats, DatabaseError> {
        sqlx::query_as::<_, WithdrawalStats>(
            "SELECT
                 COUNT(*) FILTER (WHERE status = 'PENDING') AS pending_count,
                 COUNT(*) FILTER (WHERE status = 'APPROVED') AS approved_count,
                 COUNT(*) FILTER (WHERE status = 'COMPLETED') AS completed_count,
                 COUNT(*) FILTER (WHERE status = 'REJECTED') AS rejected_count,
                 COUNT(*) FILTER (WHERE status = 'FAILED') AS failed_count,
                 COALESCE(SUM(amount_credits) FILTER (WHERE status = 'PENDING'), 0)::BIGINT
                     AS pending_credits,
                 COALESCE(SUM(amount_credits) FILTER (WHERE status = 'COMPLETED'), 0)::BIGINT
                     AS completed_credits
             FROM withdrawal_requests",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Admin review queue, optionally narrowed to one status.
    pub async fn list_by_status(
        &self,
        status: Option<WithdrawalStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WithdrawalRequest>, DatabaseError> {
        sqlx::query_as::<_, WithdrawalRequest>(&format!(
            "SELECT {WITHDRAWAL_COLUMNS} FROM withdrawal_requests
             WHERE ($1::TEXT IS NULL OR status = $1)
             ORDER BY created_at ASC
             LIMIT $2 OFFSET $3",
        ))
        .bind(status.map(|s| s.as_str().to_string()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
