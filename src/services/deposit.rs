//! Deposit crediting from confirmed inbound-transfer events.
//!
//! This path is fire-and-forget from the custody service's point of view:
//! anything that stops an event from crediting is logged and the event is
//! dropped, never surfaced as an error to the sender. Replays are handled
//! by the unique index on the deposit tx hash, checked inside the same
//! transaction as the balance credit.

use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::custody::chains::token_decimals;
use crate::custody::convert;
use crate::custody::types::TransferEventData;
use crate::database::chain_repository::ChainRepository;
use crate::database::error::DatabaseError;
use crate::database::transaction_repository::{NewDeposit, TransactionRepository};
use crate::database::user_repository::UserRepository;
use crate::database::wallet_repository::WalletRepository;

/// What happened to a delivered deposit event. Never an error: the webhook
/// endpoint acknowledges regardless.
#[derive(Debug)]
pub enum DepositOutcome {
    Credited {
        transaction_id: Uuid,
        user_id: i64,
        credits: i64,
    },
    /// Dropped, with the precondition that failed
    Ignored(&'static str),
}

pub struct DepositService {
    pool: PgPool,
    users: Arc<UserRepository>,
    wallets: Arc<WalletRepository>,
    chains: Arc<ChainRepository>,
    transactions: Arc<TransactionRepository>,
}

impl DepositService {
    pub fn new(
        pool: PgPool,
        users: Arc<UserRepository>,
        wallets: Arc<WalletRepository>,
        chains: Arc<ChainRepository>,
        transactions: Arc<TransactionRepository>,
    ) -> Self {
        Self {
            pool,
            users,
            wallets,
            chains,
            transactions,
        }
    }

    /// Apply one inbound-transfer event. Each precondition short-circuits
    /// with a logged reason instead of an error.
    pub async fn process(
        &self,
        data: &TransferEventData,
        raw_payload: serde_json::Value,
    ) -> DepositOutcome {
        match self.try_credit(data, raw_payload).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_unique_violation() => {
                info!(
                    external_transfer_id = %data.id,
                    tx_hash = ?data.tx_hash,
                    "duplicate deposit event dropped"
                );
                DepositOutcome::Ignored("duplicate event")
            }
            Err(e) => {
                warn!(
                    external_transfer_id = %data.id,
                    error = %e,
                    "deposit processing failed, event dropped"
                );
                DepositOutcome::Ignored("database error")
            }
        }
    }

    async fn try_credit(
        &self,
        data: &TransferEventData,
        raw_payload: serde_json::Value,
    ) -> Result<DepositOutcome, DatabaseError> {
        if !data.is_inbound() {
            return Ok(DepositOutcome::Ignored("not an inbound transfer"));
        }

        let tx_hash = match data.tx_hash.as_deref().filter(|h| !h.is_empty()) {
            Some(h) => h,
            None => return Ok(DepositOutcome::Ignored("missing tx hash")),
        };
        let raw_amount = match data.raw_amount.as_deref().filter(|a| !a.is_empty()) {
            Some(a) => a,
            None => return Ok(DepositOutcome::Ignored("missing raw amount")),
        };

        let wallet = match self.wallets.find_by_custody_wallet_id(&data.wallet_id).await? {
            Some(w) => w,
            None => {
                warn!(custody_wallet_id = %data.wallet_id, "deposit for unknown wallet dropped");
                return Ok(DepositOutcome::Ignored("unknown wallet"));
            }
        };

        let chain = match self.chains.find_by_id(wallet.chain_id).await? {
            Some(c) => c,
            None => {
                warn!(chain_id = wallet.chain_id, "deposit on unconfigured chain dropped");
                return Ok(DepositOutcome::Ignored("unconfigured chain"));
            }
        };

        let contract = data.contract_address.as_deref().unwrap_or("");
        let token_symbol = match chain.token_symbol_for_contract(contract) {
            Some(s) => s,
            None => {
                warn!(
                    contract_address = %contract,
                    chain = %chain.name,
                    "deposit of unknown token dropped"
                );
                return Ok(DepositOutcome::Ignored("unknown token contract"));
            }
        };

        let decimals = match token_decimals(token_symbol) {
            Some(d) => d,
            None => return Ok(DepositOutcome::Ignored("no decimals for token")),
        };

        let credits = match convert::to_credits(raw_amount, decimals) {
            Ok(c) => c,
            Err(e) => {
                warn!(raw_amount = %raw_amount, error = %e, "unconvertible deposit amount dropped");
                return Ok(DepositOutcome::Ignored("unconvertible amount"));
            }
        };
        if credits <= 0 {
            return Ok(DepositOutcome::Ignored("dust amount"));
        }

        // Ledger entry and balance credit land together or not at all. A
        // replayed tx hash violates the unique index, rolling both back.
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        let transaction = self
            .transactions
            .insert_deposit(
                &mut tx,
                NewDeposit {
                    user_id: wallet.user_id,
                    wallet_id: wallet.id,
                    chain_id: chain.chain_id,
                    chain_name: &chain.name,
                    token_symbol,
                    token_address: contract,
                    raw_amount,
                    amount_credits: credits,
                    tx_hash,
                    from_address: data.from_address.as_deref(),
                    to_address: data.to_address.as_deref().unwrap_or(&wallet.address),
                    external_transfer_id: &data.id,
                    confirmations: chain.min_confirmations,
                    webhook_payload: raw_payload,
                },
            )
            .await?;

        let balance = self
            .users
            .credit_credits(&mut tx, wallet.user_id, credits)
            .await?;

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        info!(
            transaction_id = %transaction.id,
            user_id = wallet.user_id,
            credits,
            balance,
            tx_hash = %tx_hash,
            "deposit credited"
        );
        Ok(DepositOutcome::Credited {
            transaction_id: transaction.id,
            user_id: wallet.user_id,
            credits,
        })
    }
}
