//! Finalization of outbound transfers from custody outcome events.
//!
//! Outcome events are at-least-once and unordered. The request-side update
//! is a guarded claim (APPROVED rows only), so the first event to land
//! finalizes the withdrawal and every replay is a no-op; the compensating
//! refund on failure commits in the same transaction as both status
//! updates.

use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::custody::types::TransferEventData;
use crate::database::error::DatabaseError;
use crate::database::transaction_repository::TransactionRepository;
use crate::database::types::{TransactionType, WithdrawalStatus};
use crate::database::user_repository::UserRepository;
use crate::database::withdrawal_repository::WithdrawalRepository;

/// What happened to a delivered outcome event. Like deposits, this path
/// acknowledges the sender regardless.
#[derive(Debug)]
pub enum ReconcileOutcome {
    Completed {
        transaction_id: Uuid,
    },
    /// Failed withdrawal: credits handed back to the user
    Refunded {
        transaction_id: Uuid,
        user_id: i64,
        credits: i64,
    },
    /// Failed transfer with nothing to refund (not a withdrawal)
    MarkedFailed {
        transaction_id: Uuid,
    },
    Ignored(&'static str),
}

pub struct ReconcilerService {
    pool: PgPool,
    users: Arc<UserRepository>,
    transactions: Arc<TransactionRepository>,
    withdrawals: Arc<WithdrawalRepository>,
}

impl ReconcilerService {
    pub fn new(
        pool: PgPool,
        users: Arc<UserRepository>,
        transactions: Arc<TransactionRepository>,
        withdrawals: Arc<WithdrawalRepository>,
    ) -> Self {
        Self {
            pool,
            users,
            transactions,
            withdrawals,
        }
    }

    pub async fn process_completed(&self, data: &TransferEventData) -> ReconcileOutcome {
        match self.finalize_completed(data).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    external_transfer_id = %data.id,
                    error = %e,
                    "transfer-completed reconciliation failed, event dropped"
                );
                ReconcileOutcome::Ignored("database error")
            }
        }
    }

    pub async fn process_failed(&self, data: &TransferEventData) -> ReconcileOutcome {
        match self.finalize_failed(data).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    external_transfer_id = %data.id,
                    error = %e,
                    "transfer-failed reconciliation failed, event dropped"
                );
                ReconcileOutcome::Ignored("database error")
            }
        }
    }

    async fn finalize_completed(
        &self,
        data: &TransferEventData,
    ) -> Result<ReconcileOutcome, DatabaseError> {
        let txn = match self.transactions.find_by_external_transfer_id(&data.id).await? {
            Some(t) => t,
            None => return Ok(ReconcileOutcome::Ignored("unknown transfer")),
        };

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        if txn.r#type == TransactionType::Withdrawal {
            let claimed = self
                .withdrawals
                .claim_approved_by_transaction(&mut tx, txn.id, WithdrawalStatus::Completed, "")
                .await?;
            if claimed.is_none() {
                // Already finalized by an earlier delivery; leave the
                // ledger entry exactly as that delivery wrote it.
                return Ok(ReconcileOutcome::Ignored("already finalized"));
            }
        }

        self.transactions
            .mark_completed(&mut tx, txn.id, data.tx_hash.as_deref())
            .await?;

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        info!(
            transaction_id = %txn.id,
            external_transfer_id = %data.id,
            "transfer completed"
        );
        Ok(ReconcileOutcome::Completed {
            transaction_id: txn.id,
        })
    }

    async fn finalize_failed(
        &self,
        data: &TransferEventData,
    ) -> Result<ReconcileOutcome, DatabaseError> {
        let txn = match self.transactions.find_by_external_transfer_id(&data.id).await? {
            Some(t) => t,
            None => return Ok(ReconcileOutcome::Ignored("unknown transfer")),
        };

        let error_message = format!("custody transfer {} failed", data.id);
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        if txn.r#type == TransactionType::Withdrawal {
            let claimed = self
                .withdrawals
                .claim_approved_by_transaction(
                    &mut tx,
                    txn.id,
                    WithdrawalStatus::Failed,
                    &error_message,
                )
                .await?;
            let request = match claimed {
                Some(r) => r,
                None => return Ok(ReconcileOutcome::Ignored("already finalized")),
            };

            // Compensating refund, in the same transaction as both status
            // updates. The claim guard means it can only ever apply once.
            self.users
                .credit_credits(&mut tx, request.user_id, request.amount_credits)
                .await?;
            self.transactions
                .mark_failed(&mut tx, txn.id, &error_message)
                .await?;

            tx.commit().await.map_err(DatabaseError::from_sqlx)?;

            info!(
                transaction_id = %txn.id,
                user_id = request.user_id,
                refunded = request.amount_credits,
                "failed withdrawal refunded"
            );
            return Ok(ReconcileOutcome::Refunded {
                transaction_id: txn.id,
                user_id: request.user_id,
                credits: request.amount_credits,
            });
        }

        self.transactions
            .mark_failed(&mut tx, txn.id, &error_message)
            .await?;
        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        info!(transaction_id = %txn.id, "transfer marked failed");
        Ok(ReconcileOutcome::MarkedFailed {
            transaction_id: txn.id,
        })
    }
}
