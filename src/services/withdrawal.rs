//! Withdrawal state machine: user-initiated requests, admin approval and
//! rejection, and the balance debit/refund invariants around them.
//!
//! Every balance mutation happens inside one database transaction together
//! with the row that justifies it. The user row is locked for the debit,
//! the request row for admin actions, so concurrent calls serialize instead
//! of racing.

use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::custody::chains::{chain_info, token_decimals};
use crate::custody::convert;
use crate::custody::types::TransferRequest;
use crate::custody::CustodyApi;
use crate::database::chain_repository::ChainRepository;
use crate::database::error::{DatabaseError, DatabaseErrorKind};
use crate::database::transaction_repository::{
    CryptoTransaction, NewWithdrawal, TransactionRepository,
};
use crate::database::types::WithdrawalStatus;
use crate::database::user_repository::UserRepository;
use crate::database::wallet_repository::WalletRepository;
use crate::database::withdrawal_repository::{
    WithdrawalRepository, WithdrawalRequest, WithdrawalStats,
};
use crate::error::{AppError, AppResult, DomainError, ValidationError};
use crate::services::limits;

/// Outcome of an approval: the updated request plus the custody-accepted
/// ledger entry it is now linked to.
#[derive(Debug)]
pub struct ApprovedWithdrawal {
    pub request: WithdrawalRequest,
    pub transaction: CryptoTransaction,
}

/// Admin review view: the request, the ledger entry it is linked to once
/// approved, and where the user's balance stands now.
pub struct WithdrawalDetail {
    pub request: WithdrawalRequest,
    pub transaction: Option<CryptoTransaction>,
    pub user_balance: i64,
}

pub struct WithdrawalService {
    pool: PgPool,
    users: Arc<UserRepository>,
    wallets: Arc<WalletRepository>,
    chains: Arc<ChainRepository>,
    transactions: Arc<TransactionRepository>,
    withdrawals: Arc<WithdrawalRepository>,
    custody: Arc<dyn CustodyApi>,
}

impl WithdrawalService {
    pub fn new(
        pool: PgPool,
        users: Arc<UserRepository>,
        wallets: Arc<WalletRepository>,
        chains: Arc<ChainRepository>,
        transactions: Arc<TransactionRepository>,
        withdrawals: Arc<WithdrawalRepository>,
        custody: Arc<dyn CustodyApi>,
    ) -> Self {
        Self {
            pool,
            users,
            wallets,
            chains,
            transactions,
            withdrawals,
            custody,
        }
    }

    /// Create a PENDING request and debit the credits in one transaction.
    /// No partial effect: a failed validation or an insufficient balance
    /// leaves the ledger untouched.
    pub async fn initiate(
        &self,
        user_id: i64,
        chain_name: &str,
        token_symbol: &str,
        amount_credits: i64,
        to_address: &str,
    ) -> AppResult<WithdrawalRequest> {
        limits::check_amount_range(amount_credits)?;

        let chain = self
            .chains
            .find_by_name(chain_name)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| {
                AppError::validation(ValidationError::InvalidChain {
                    name: chain_name.to_string(),
                })
            })?;

        if chain.token_address(token_symbol).is_none() || token_decimals(token_symbol).is_none() {
            return Err(AppError::validation(ValidationError::InvalidToken {
                symbol: token_symbol.to_string(),
            }));
        }

        let info = chain_info(&chain.name).ok_or_else(|| {
            AppError::validation(ValidationError::InvalidChain {
                name: chain.name.clone(),
            })
        })?;
        if !info.is_valid_address(to_address) {
            return Err(AppError::validation(ValidationError::InvalidAddress {
                address: to_address.to_string(),
                chain: chain.name.clone(),
            }));
        }

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        let user = self
            .users
            .lock_by_id(&mut tx, user_id)
            .await?
            .ok_or_else(|| AppError::from(DatabaseError::new(DatabaseErrorKind::NotFound)))?;

        if user.account_balance < amount_credits {
            return Err(AppError::domain(DomainError::InsufficientBalance {
                available: user.account_balance,
                required: amount_credits,
            }));
        }

        let used_today = self
            .withdrawals
            .daily_withdrawn_credits(&mut tx, user_id)
            .await?;
        limits::check_daily_limit(used_today, amount_credits)?;

        // The row lock makes this guard redundant in practice, but the
        // debit is still written to never drive the balance negative.
        let debited = self
            .users
            .debit_credits(&mut tx, user_id, amount_credits)
            .await?;
        if debited.is_none() {
            return Err(AppError::domain(DomainError::InsufficientBalance {
                available: user.account_balance,
                required: amount_credits,
            }));
        }

        let request = self
            .withdrawals
            .insert(
                &mut tx,
                user_id,
                chain.chain_id,
                &chain.name,
                &token_symbol.to_ascii_uppercase(),
                amount_credits,
                to_address,
            )
            .await?;

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        info!(
            request_id = %request.id,
            user_id,
            amount_credits,
            chain = %chain.name,
            "withdrawal request created"
        );
        Ok(request)
    }

    /// Approve a PENDING request: initiate the custody transfer, record the
    /// APPROVED ledger entry, and link it to the request.
    ///
    /// The request row stays locked across the custody call, so a
    /// concurrent approve or reject of the same request waits and then
    /// fails its own state check. If the custody call fails, the
    /// transaction rolls back and the request is still PENDING; the debit
    /// from initiation stays in place since the funds remain reserved.
    pub async fn approve(
        &self,
        admin_id: i64,
        request_id: Uuid,
        note: &str,
    ) -> AppResult<ApprovedWithdrawal> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        let request = self
            .withdrawals
            .lock_by_id(&mut tx, request_id)
            .await?
            .ok_or_else(|| AppError::domain(DomainError::WithdrawalNotFound { id: request_id }))?;

        if !request.status.can_transition_to(WithdrawalStatus::Approved) {
            return Err(AppError::domain(DomainError::InvalidStateTransition {
                current: request.status,
                attempted: WithdrawalStatus::Approved,
            }));
        }

        let wallet = self
            .wallets
            .find_active(request.user_id, request.chain_id)
            .await?
            .ok_or_else(|| {
                AppError::domain(DomainError::WalletNotFound {
                    user_id: request.user_id,
                    chain_id: request.chain_id,
                })
            })?;

        let chain = self
            .chains
            .find_by_id(request.chain_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| {
                AppError::domain(DomainError::ChainNotConfigured {
                    chain_id: request.chain_id,
                })
            })?;

        let unsupported = || {
            AppError::domain(DomainError::UnsupportedToken {
                symbol: request.token_symbol.clone(),
                chain_name: chain.name.clone(),
            })
        };
        let token_address = chain
            .token_address(&request.token_symbol)
            .ok_or_else(unsupported)?
            .to_string();
        let decimals = token_decimals(&request.token_symbol).ok_or_else(unsupported)?;

        let info = chain_info(&chain.name).ok_or_else(|| {
            AppError::domain(DomainError::ChainNotConfigured {
                chain_id: request.chain_id,
            })
        })?;

        let raw_amount =
            convert::to_raw_amount(request.amount_credits, decimals).map_err(|_| {
                AppError::validation(ValidationError::OutOfRange {
                    field: "amount_credits".to_string(),
                    min: Some(0),
                    max: None,
                })
            })?;

        // External call inside the transaction: a failure here rolls the
        // whole approval back and releases the lock.
        let transfer = self
            .custody
            .initiate_transfer(
                &wallet.custody_wallet_id,
                TransferRequest {
                    kind: info.transfer_kind(),
                    to_address: request.to_address.clone(),
                    contract_address: Some(token_address.clone()),
                    amount: raw_amount.clone(),
                },
            )
            .await
            .map_err(|e| {
                warn!(
                    request_id = %request_id,
                    error = %e,
                    "custody transfer initiation failed, request stays PENDING"
                );
                AppError::from(e)
            })?;

        let transaction = self
            .transactions
            .insert_withdrawal(
                &mut tx,
                NewWithdrawal {
                    user_id: request.user_id,
                    wallet_id: wallet.id,
                    chain_id: chain.chain_id,
                    chain_name: &chain.name,
                    token_symbol: &request.token_symbol,
                    token_address: &token_address,
                    raw_amount: &raw_amount,
                    amount_credits: request.amount_credits,
                    to_address: &request.to_address,
                    external_transfer_id: &transfer.id,
                },
            )
            .await?;

        let request = self
            .withdrawals
            .mark_approved(&mut tx, request_id, admin_id, note, transaction.id)
            .await?;

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        info!(
            request_id = %request_id,
            admin_id,
            external_transfer_id = %transfer.id,
            "withdrawal approved"
        );
        Ok(ApprovedWithdrawal {
            request,
            transaction,
        })
    }

    /// Reject a PENDING request and refund the debited credits, atomically.
    /// Returns the updated request; `amount_credits` is the refunded sum.
    pub async fn reject(
        &self,
        admin_id: i64,
        request_id: Uuid,
        reason: &str,
    ) -> AppResult<WithdrawalRequest> {
        if reason.trim().is_empty() {
            return Err(AppError::validation(ValidationError::MissingField {
                field: "reason".to_string(),
            }));
        }

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        let request = self
            .withdrawals
            .lock_by_id(&mut tx, request_id)
            .await?
            .ok_or_else(|| AppError::domain(DomainError::WithdrawalNotFound { id: request_id }))?;

        if !request.status.can_transition_to(WithdrawalStatus::Rejected) {
            return Err(AppError::domain(DomainError::InvalidStateTransition {
                current: request.status,
                attempted: WithdrawalStatus::Rejected,
            }));
        }

        self.users
            .credit_credits(&mut tx, request.user_id, request.amount_credits)
            .await?;

        let request = self
            .withdrawals
            .mark_rejected(&mut tx, request_id, admin_id, reason.trim())
            .await?;

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        info!(
            request_id = %request_id,
            admin_id,
            refunded = request.amount_credits,
            "withdrawal rejected and refunded"
        );
        Ok(request)
    }

    pub async fn get(&self, request_id: Uuid) -> AppResult<WithdrawalRequest> {
        self.withdrawals
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::domain(DomainError::WithdrawalNotFound { id: request_id }))
    }

    /// Full review view of one request: the linked ledger entry, if custody
    /// has accepted a transfer, and the user's current balance.
    pub async fn detail(&self, request_id: Uuid) -> AppResult<WithdrawalDetail> {
        let request = self.get(request_id).await?;

        let transaction = match request.transaction_id {
            Some(id) => self.transactions.find_by_id(id).await?,
            None => None,
        };
        let user_balance = self
            .users
            .find_by_id(request.user_id)
            .await?
            .map(|u| u.account_balance)
            .unwrap_or(0);

        Ok(WithdrawalDetail {
            request,
            transaction,
            user_balance,
        })
    }

    pub async fn list_for_user(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<WithdrawalRequest>> {
        Ok(self
            .withdrawals
            .list_for_user(user_id, limit, offset)
            .await?)
    }

    pub async fn list_admin(
        &self,
        status: Option<WithdrawalStatus>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<WithdrawalRequest>> {
        Ok(self.withdrawals.list_by_status(status, limit, offset).await?)
    }

    pub async fn stats(&self) -> AppResult<WithdrawalStats> {
        Ok(self.withdrawals.stats_by_status().await?)
    }
}
