//! Deposit wallet provisioning and the user-facing ledger views.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::custody::chains::{chain_info, SUPPORTED_TOKENS};
use crate::custody::CustodyApi;
use crate::database::chain_repository::{ChainRepository, SupportedChain};
use crate::database::transaction_repository::{CryptoTransaction, TransactionRepository};
use crate::database::user_repository::{User, UserRepository};
use crate::database::wallet_repository::{Wallet, WalletRepository};
use crate::error::{AppError, AppResult, DomainError, ValidationError};

pub struct WalletService {
    users: Arc<UserRepository>,
    wallets: Arc<WalletRepository>,
    chains: Arc<ChainRepository>,
    transactions: Arc<TransactionRepository>,
    custody: Arc<dyn CustodyApi>,
}

impl WalletService {
    pub fn new(
        users: Arc<UserRepository>,
        wallets: Arc<WalletRepository>,
        chains: Arc<ChainRepository>,
        transactions: Arc<TransactionRepository>,
        custody: Arc<dyn CustodyApi>,
    ) -> Self {
        Self {
            users,
            wallets,
            chains,
            transactions,
            custody,
        }
    }

    /// Return the user's deposit wallet for a chain, provisioning one
    /// through custody on first use. A concurrent first call races on the
    /// one-active-wallet index; the loser re-reads the winner's row.
    pub async fn get_or_create_deposit_wallet(
        &self,
        user_id: i64,
        chain_name: &str,
    ) -> AppResult<Wallet> {
        let chain = self
            .chains
            .find_by_name(chain_name)
            .await?
            .ok_or_else(|| {
                AppError::validation(ValidationError::InvalidChain {
                    name: chain_name.to_string(),
                })
            })?;

        if let Some(existing) = self.wallets.find_active(user_id, chain.chain_id).await? {
            return Ok(existing);
        }

        let info = chain_info(&chain.name).ok_or_else(|| {
            AppError::domain(DomainError::ChainNotConfigured {
                chain_id: chain.chain_id,
            })
        })?;

        let external_ref = format!("user-{}-{}", user_id, chain.name);
        let created = self
            .custody
            .create_wallet(info.custody_network, &external_ref)
            .await?;

        match self
            .wallets
            .create(
                user_id,
                &created.id,
                chain.chain_id,
                &chain.name,
                &created.address,
            )
            .await
        {
            Ok(wallet) => {
                info!(
                    user_id,
                    chain = %chain.name,
                    wallet_id = %wallet.id,
                    "deposit wallet provisioned"
                );
                Ok(wallet)
            }
            Err(e) if e.is_unique_violation() => {
                // Lost the provisioning race; the other call's wallet wins.
                self.wallets
                    .find_active(user_id, chain.chain_id)
                    .await?
                    .ok_or_else(|| AppError::from(e))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Provision deposit wallets on every active chain. A chain whose
    /// provisioning fails is skipped and logged; the rest still succeed,
    /// so a retry only touches the chains that are missing.
    pub async fn provision_all_chains(&self, user_id: i64) -> AppResult<Vec<Wallet>> {
        let chains = self.chains.list_active().await?;
        let mut wallets = Vec::with_capacity(chains.len());
        for chain in chains {
            match self.get_or_create_deposit_wallet(user_id, &chain.name).await {
                Ok(wallet) => wallets.push(wallet),
                Err(e) => {
                    warn!(
                        user_id,
                        chain = %chain.name,
                        error = %e,
                        "skipping chain, wallet provisioning failed"
                    );
                }
            }
        }
        Ok(wallets)
    }

    pub async fn get_user(&self, user_id: i64) -> AppResult<Option<User>> {
        Ok(self.users.find_by_id(user_id).await?)
    }

    pub async fn list_wallets(&self, user_id: i64) -> AppResult<Vec<Wallet>> {
        Ok(self.wallets.list_for_user(user_id).await?)
    }

    pub async fn list_chains(&self) -> AppResult<Vec<SupportedChain>> {
        Ok(self.chains.list_active().await?)
    }

    /// Tokens configured on one chain: supported symbols whose contract
    /// address is set in the chain directory.
    pub async fn tokens_for_chain(&self, chain_name: &str) -> AppResult<Vec<ChainToken>> {
        let chain = self
            .chains
            .find_by_name(chain_name)
            .await?
            .ok_or_else(|| {
                AppError::validation(ValidationError::InvalidChain {
                    name: chain_name.to_string(),
                })
            })?;

        Ok(SUPPORTED_TOKENS
            .iter()
            .filter_map(|&(symbol, decimals)| {
                chain.token_address(symbol).map(|address| ChainToken {
                    symbol,
                    decimals,
                    contract_address: address.to_string(),
                })
            })
            .collect())
    }

    pub async fn list_transactions(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<CryptoTransaction>> {
        Ok(self.transactions.list_for_user(user_id, limit, offset).await?)
    }

    /// One transaction, scoped to its owner.
    pub async fn get_transaction(
        &self,
        user_id: i64,
        transaction_id: Uuid,
    ) -> AppResult<CryptoTransaction> {
        self.transactions
            .find_by_id(transaction_id)
            .await?
            .filter(|t| t.user_id == user_id)
            .ok_or_else(|| AppError::domain(DomainError::TransactionNotFound { id: transaction_id }))
    }
}

/// A token as configured on one chain
#[derive(Debug, Clone)]
pub struct ChainToken {
    pub symbol: &'static str,
    pub decimals: u32,
    pub contract_address: String,
}
