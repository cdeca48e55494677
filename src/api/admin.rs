//! Admin routes for the withdrawal review queue.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::wallet::{PageQuery, TransactionView, WithdrawalView};
use crate::database::types::WithdrawalStatus;
use crate::error::{AppError, AppResult, ValidationError};
use crate::services::WithdrawalService;

#[derive(Clone)]
pub struct AdminState {
    pub withdrawals: Arc<WithdrawalService>,
}

pub fn routes(state: AdminState) -> Router {
    Router::new()
        .route("/api/admin/withdrawals", get(list_withdrawals))
        .route("/api/admin/withdrawals/stats", get(withdrawal_stats))
        .route("/api/admin/withdrawals/{id}", get(get_withdrawal))
        .route("/api/admin/withdrawals/{id}/approve", post(approve))
        .route("/api/admin/withdrawals/{id}/reject", post(reject))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<String>,
    #[serde(flatten)]
    page: PageQuery,
}

async fn list_withdrawals(
    State(state): State<AdminState>,
    Query(query): Query<ListQuery>,
) -> AppResult<impl IntoResponse> {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<WithdrawalStatus>().map_err(|_| {
            AppError::validation(ValidationError::InvalidValue {
                field: "status".to_string(),
                value: raw.to_string(),
            })
        })?),
    };

    let (limit, offset) = query.page.clamped();
    let requests = state.withdrawals.list_admin(status, limit, offset).await?;
    Ok(Json(
        requests
            .into_iter()
            .map(WithdrawalView::from)
            .collect::<Vec<_>>(),
    ))
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    pending: i64,
    approved: i64,
    completed: i64,
    rejected: i64,
    failed: i64,
    pending_credits: i64,
    completed_credits: i64,
}

async fn withdrawal_stats(State(state): State<AdminState>) -> AppResult<impl IntoResponse> {
    let stats = state.withdrawals.stats().await?;
    Ok(Json(StatsResponse {
        pending: stats.pending_count,
        approved: stats.approved_count,
        completed: stats.completed_count,
        rejected: stats.rejected_count,
        failed: stats.failed_count,
        pending_credits: stats.pending_credits,
        completed_credits: stats.completed_credits,
    }))
}

#[derive(Debug, Serialize)]
struct WithdrawalDetailResponse {
    request: WithdrawalView,
    transaction: Option<TransactionView>,
    user_balance: i64,
}

async fn get_withdrawal(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let detail = state.withdrawals.detail(id).await?;
    Ok(Json(WithdrawalDetailResponse {
        request: WithdrawalView::from(detail.request),
        transaction: detail.transaction.map(TransactionView::from),
        user_balance: detail.user_balance,
    }))
}

#[derive(Debug, Deserialize)]
struct ApproveRequest {
    admin_id: i64,
    #[serde(default)]
    note: String,
}

#[derive(Debug, Serialize)]
struct ApproveResponse {
    request: WithdrawalView,
    transaction_id: Uuid,
    external_transfer_id: String,
}

async fn approve(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ApproveRequest>,
) -> AppResult<impl IntoResponse> {
    let approved = state.withdrawals.approve(body.admin_id, id, &body.note).await?;
    Ok(Json(ApproveResponse {
        transaction_id: approved.transaction.id,
        external_transfer_id: approved.transaction.external_transfer_id.clone(),
        request: WithdrawalView::from(approved.request),
    }))
}

#[derive(Debug, Deserialize)]
struct RejectRequest {
    admin_id: i64,
    reason: String,
}

#[derive(Debug, Serialize)]
struct RejectResponse {
    request: WithdrawalView,
    refunded_credits: i64,
}

async fn reject(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RejectRequest>,
) -> AppResult<impl IntoResponse> {
    let request = state.withdrawals.reject(body.admin_id, id, &body.reason).await?;
    Ok(Json(RejectResponse {
        refunded_credits: request.amount_credits,
        request: WithdrawalView::from(request),
    }))
}
