use serde::{Deserialize, Serialize};

/// Webhook event kinds the custody service pushes to us
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum EventKind {
    /// An inbound transfer was observed on-chain (may be unconfirmed)
    #[serde(rename = "wallet.transfer.inbound")]
    InboundTransfer,
    /// An inbound transfer reached the confirmation threshold
    #[serde(rename = "wallet.transfer.confirmed")]
    TransferConfirmed,
    /// An outbound transfer we initiated settled on-chain
    #[serde(rename = "wallet.transfer.completed")]
    TransferCompleted,
    /// An outbound transfer we initiated failed
    #[serde(rename = "wallet.transfer.failed")]
    TransferFailed,
    /// Anything we don't consume; acknowledged and dropped
    #[serde(other)]
    Unknown,
}

/// Webhook envelope pushed by the custody service
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub id: String,
    pub kind: EventKind,
    pub data: TransferEventData,
    #[serde(default)]
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

/// Transfer payload carried inside a webhook envelope.
///
/// `id` is the custody-side transfer id, our idempotency key for outbound
/// reconciliation. `raw_amount` is a base-unit decimal string and is never
/// parsed into a float. Only `id` is required on the wire: outcome events
/// for outbound transfers carry no wallet id, and the deposit path treats
/// an empty one as an unknown-wallet drop.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEventData {
    pub id: String,
    #[serde(default)]
    pub wallet_id: String,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub raw_amount: Option<String>,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub from_address: Option<String>,
    #[serde(default)]
    pub to_address: Option<String>,
}

impl TransferEventData {
    pub fn is_inbound(&self) -> bool {
        matches!(
            self.direction.as_deref(),
            Some(d) if d.eq_ignore_ascii_case("in") || d.eq_ignore_ascii_case("inbound")
        )
    }
}

/// How the token moves on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransferKind {
    #[serde(rename = "Erc20")]
    Erc20,
    #[serde(rename = "Trc20")]
    Trc20,
}

/// Outbound transfer request sent to the custody API
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub kind: TransferKind,
    pub to_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    /// Base-unit amount as a decimal string
    pub amount: String,
}

/// Custody API response for an accepted transfer
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    pub id: String,
    pub status: String,
}

/// Custody API response for a provisioned wallet
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedWallet {
    pub id: String,
    pub address: String,
    pub network: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_parses_known_kind() {
        let payload = r#"{
            "id": "evt_1",
            "kind": "wallet.transfer.confirmed",
            "data": {
                "id": "xfer_1",
                "walletId": "cw_1",
                "txHash": "0xabc",
                "direction": "In",
                "rawAmount": "2500000",
                "contractAddress": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
                "toAddress": "0x1111111111111111111111111111111111111111"
            }
        }"#;

        let envelope: WebhookEnvelope = serde_json::from_str(payload).unwrap();
        assert_eq!(envelope.kind, EventKind::TransferConfirmed);
        assert!(envelope.data.is_inbound());
        assert_eq!(envelope.data.raw_amount.as_deref(), Some("2500000"));
    }

    #[test]
    fn test_unknown_kind_is_tolerated() {
        let payload = r#"{
            "id": "evt_2",
            "kind": "wallet.created",
            "data": {"id": "xfer_2", "walletId": "cw_1"}
        }"#;

        let envelope: WebhookEnvelope = serde_json::from_str(payload).unwrap();
        assert_eq!(envelope.kind, EventKind::Unknown);
        assert!(!envelope.data.is_inbound());
    }
}
