//! Custody webhook endpoint.
//!
//! The only error a sender ever sees is 401 for a missing or invalid
//! signature. Everything after verification is acknowledged with 200:
//! malformed envelopes, unknown wallets, and duplicates are logged and
//! dropped so the custody service doesn't retry events we will never
//! accept.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::custody::types::EventKind;
use crate::custody::webhook::{self, SIGNATURE_HEADER};
use crate::services::{DepositService, ReconcilerService};

#[derive(Clone)]
pub struct WebhookState {
    pub webhook_secret: String,
    pub deposits: Arc<DepositService>,
    pub reconciler: Arc<ReconcilerService>,
}

pub fn routes(state: WebhookState) -> Router {
    Router::new()
        .route("/webhooks/custody", post(handle_custody_webhook))
        .with_state(state)
}

// The body stays raw bytes until the signature is verified, so even a
// non-UTF-8 payload gets the same 401-or-ack treatment.
async fn handle_custody_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let signature = match signature {
        Some(s) => s,
        None => {
            warn!("custody webhook without signature rejected");
            return (StatusCode::UNAUTHORIZED, "Missing signature").into_response();
        }
    };

    if !webhook::verify_signature(&body, &state.webhook_secret, signature) {
        warn!("custody webhook with invalid signature rejected");
        return (StatusCode::UNAUTHORIZED, "Invalid signature").into_response();
    }

    let envelope = match webhook::parse_envelope(&body) {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, "malformed custody webhook dropped");
            return ack();
        }
    };

    let raw_payload: serde_json::Value =
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);

    match envelope.kind {
        EventKind::TransferConfirmed => {
            let outcome = state.deposits.process(&envelope.data, raw_payload).await;
            info!(event_id = %envelope.id, ?outcome, "deposit event handled");
        }
        EventKind::InboundTransfer => {
            // Observed but unconfirmed; crediting waits for confirmation.
            info!(
                event_id = %envelope.id,
                external_transfer_id = %envelope.data.id,
                "unconfirmed inbound transfer acknowledged"
            );
        }
        EventKind::TransferCompleted => {
            let outcome = state.reconciler.process_completed(&envelope.data).await;
            info!(event_id = %envelope.id, ?outcome, "transfer-completed event handled");
        }
        EventKind::TransferFailed => {
            let outcome = state.reconciler.process_failed(&envelope.data).await;
            info!(event_id = %envelope.id, ?outcome, "transfer-failed event handled");
        }
        EventKind::Unknown => {
            info!(event_id = %envelope.id, "unhandled custody event kind acknowledged");
        }
    }

    ack()
}

fn ack() -> axum::response::Response {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
}
