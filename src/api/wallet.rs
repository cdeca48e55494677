//! User-facing wallet routes: balance, deposit addresses, history, and
//! withdrawal initiation.
//!
//! Authentication is handled upstream of this service; handlers take the
//! resolved user id directly.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::chain_repository::SupportedChain;
use crate::database::transaction_repository::CryptoTransaction;
use crate::database::wallet_repository::Wallet;
use crate::database::withdrawal_repository::WithdrawalRequest;
use crate::error::{AppError, AppResult, DomainError};
use crate::custody::chains;
use crate::services::{limits, ChainToken, WalletService, WithdrawalService};

#[derive(Clone)]
pub struct WalletState {
    pub wallets: Arc<WalletService>,
    pub withdrawals: Arc<WithdrawalService>,
}

pub fn routes(state: WalletState) -> Router {
    Router::new()
        .route("/api/chains", get(list_chains))
        .route("/api/chains/{chain}/tokens", get(list_chain_tokens))
        .route("/api/tokens", get(list_tokens))
        .route("/api/wallet-info", get(wallet_info))
        .route("/api/users/{user_id}/balance", get(get_balance))
        .route(
            "/api/users/{user_id}/wallets",
            get(list_wallets).post(provision_all_wallets),
        )
        .route(
            "/api/users/{user_id}/wallets/{chain}",
            post(create_deposit_wallet),
        )
        .route("/api/users/{user_id}/transactions", get(list_transactions))
        .route(
            "/api/users/{user_id}/transactions/{id}",
            get(get_transaction),
        )
        .route(
            "/api/users/{user_id}/withdrawals",
            get(list_withdrawals).post(initiate_withdrawal),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: i64,
    pub credits: i64,
}

#[derive(Debug, Serialize)]
pub struct WalletView {
    pub id: Uuid,
    pub chain_id: i64,
    pub chain_name: String,
    pub address: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Wallet> for WalletView {
    fn from(w: Wallet) -> Self {
        Self {
            id: w.id,
            chain_id: w.chain_id,
            chain_name: w.chain_name,
            address: w.address,
            created_at: w.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChainView {
    pub chain_id: i64,
    pub name: String,
    pub display_name: String,
    pub usdc_address: String,
    pub usdt_address: String,
    pub explorer_url: String,
    pub min_confirmations: i32,
}

impl From<SupportedChain> for ChainView {
    fn from(c: SupportedChain) -> Self {
        Self {
            chain_id: c.chain_id,
            name: c.name,
            display_name: c.display_name,
            usdc_address: c.usdc_address,
            usdt_address: c.usdt_address,
            explorer_url: c.explorer_url,
            min_confirmations: c.min_confirmations,
        }
    }
}

/// Raw token amounts serialize as decimal strings, credits as integers.
#[derive(Debug, Serialize)]
pub struct TransactionView {
    pub id: Uuid,
    pub r#type: String,
    pub status: String,
    pub chain_name: String,
    pub token_symbol: String,
    pub raw_amount: String,
    pub amount_credits: i64,
    pub tx_hash: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<CryptoTransaction> for TransactionView {
    fn from(t: CryptoTransaction) -> Self {
        Self {
            id: t.id,
            r#type: t.r#type.as_str().to_string(),
            status: t.status.as_str().to_string(),
            chain_name: t.chain_name,
            token_symbol: t.token_symbol,
            raw_amount: t.raw_amount,
            amount_credits: t.amount_credits,
            tx_hash: t.tx_hash,
            created_at: t.created_at,
            processed_at: t.processed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WithdrawalView {
    pub id: Uuid,
    pub user_id: i64,
    pub chain_name: String,
    pub token_symbol: String,
    pub amount_credits: i64,
    pub to_address: String,
    pub status: String,
    pub admin_note: String,
    pub error_message: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<WithdrawalRequest> for WithdrawalView {
    fn from(r: WithdrawalRequest) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            chain_name: r.chain_name,
            token_symbol: r.token_symbol,
            amount_credits: r.amount_credits,
            to_address: r.to_address,
            status: r.status.as_str().to_string(),
            admin_note: r.admin_note,
            error_message: r.error_message,
            created_at: r.created_at,
            processed_at: r.processed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

impl PageQuery {
    pub(crate) fn clamped(&self) -> (i64, i64) {
        (self.limit.clamp(1, 200), self.offset.max(0))
    }
}

async fn list_chains(State(state): State<WalletState>) -> AppResult<impl IntoResponse> {
    let chains = state.wallets.list_chains().await?;
    Ok(Json(
        chains.into_iter().map(ChainView::from).collect::<Vec<_>>(),
    ))
}

#[derive(Debug, Serialize)]
struct TokenView {
    symbol: &'static str,
    decimals: u32,
}

async fn list_tokens() -> impl IntoResponse {
    Json(
        chains::SUPPORTED_TOKENS
            .iter()
            .map(|&(symbol, decimals)| TokenView { symbol, decimals })
            .collect::<Vec<_>>(),
    )
}

#[derive(Debug, Serialize)]
struct ChainTokenView {
    symbol: &'static str,
    decimals: u32,
    contract_address: String,
}

impl From<ChainToken> for ChainTokenView {
    fn from(t: ChainToken) -> Self {
        Self {
            symbol: t.symbol,
            decimals: t.decimals,
            contract_address: t.contract_address,
        }
    }
}

async fn list_chain_tokens(
    State(state): State<WalletState>,
    Path(chain): Path<String>,
) -> AppResult<impl IntoResponse> {
    let tokens = state.wallets.tokens_for_chain(&chain).await?;
    Ok(Json(
        tokens
            .into_iter()
            .map(ChainTokenView::from)
            .collect::<Vec<_>>(),
    ))
}

#[derive(Debug, Serialize)]
struct WalletInfoResponse {
    supported_tokens: Vec<&'static str>,
    // 1 credit buys exactly 1 whole token unit
    credits_per_token: i64,
    min_withdrawal_credits: i64,
    max_withdrawal_credits: i64,
    daily_withdrawal_limit_credits: i64,
}

async fn wallet_info() -> impl IntoResponse {
    Json(WalletInfoResponse {
        supported_tokens: vec!["USDC", "USDT"],
        credits_per_token: 1,
        min_withdrawal_credits: limits::MIN_WITHDRAWAL,
        max_withdrawal_credits: limits::MAX_WITHDRAWAL,
        daily_withdrawal_limit_credits: limits::DAILY_LIMIT,
    })
}

async fn get_balance(
    State(state): State<WalletState>,
    Path(user_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let user = state
        .wallets
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::domain(DomainError::UserNotFound { user_id }))?;
    Ok(Json(BalanceResponse {
        user_id: user.user_id,
        credits: user.account_balance,
    }))
}

async fn list_wallets(
    State(state): State<WalletState>,
    Path(user_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let wallets = state.wallets.list_wallets(user_id).await?;
    Ok(Json(
        wallets.into_iter().map(WalletView::from).collect::<Vec<_>>(),
    ))
}

async fn provision_all_wallets(
    State(state): State<WalletState>,
    Path(user_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let wallets = state.wallets.provision_all_chains(user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(wallets.into_iter().map(WalletView::from).collect::<Vec<_>>()),
    ))
}

async fn create_deposit_wallet(
    State(state): State<WalletState>,
    Path((user_id, chain)): Path<(i64, String)>,
) -> AppResult<impl IntoResponse> {
    let wallet = state
        .wallets
        .get_or_create_deposit_wallet(user_id, &chain)
        .await?;
    Ok((StatusCode::OK, Json(WalletView::from(wallet))))
}

async fn list_transactions(
    State(state): State<WalletState>,
    Path(user_id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let (limit, offset) = page.clamped();
    let transactions = state.wallets.list_transactions(user_id, limit, offset).await?;
    Ok(Json(
        transactions
            .into_iter()
            .map(TransactionView::from)
            .collect::<Vec<_>>(),
    ))
}

async fn get_transaction(
    State(state): State<WalletState>,
    Path((user_id, id)): Path<(i64, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let transaction = state.wallets.get_transaction(user_id, id).await?;
    Ok(Json(TransactionView::from(transaction)))
}

#[derive(Debug, Deserialize)]
pub struct InitiateWithdrawalRequest {
    pub chain: String,
    pub token: String,
    pub amount_credits: i64,
    pub to_address: String,
}

async fn initiate_withdrawal(
    State(state): State<WalletState>,
    Path(user_id): Path<i64>,
    Json(body): Json<InitiateWithdrawalRequest>,
) -> AppResult<impl IntoResponse> {
    let request = state
        .withdrawals
        .initiate(
            user_id,
            &body.chain,
            &body.token,
            body.amount_credits,
            &body.to_address,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(WithdrawalView::from(request))))
}

async fn list_withdrawals(
    State(state): State<WalletState>,
    Path(user_id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let (limit, offset) = page.clamped();
    let requests = state
        .withdrawals
        .list_for_user(user_id, limit, offset)
        .await?;
    Ok(Json(
        requests
            .into_iter()
            .map(WithdrawalView::from)
            .collect::<Vec<_>>(),
    ))
}
