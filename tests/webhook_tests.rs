//! Webhook authentication and envelope handling tests

use custodia_backend::custody::types::{EventKind, WebhookEnvelope};
use custodia_backend::custody::webhook::{parse_envelope, sign_payload, verify_signature};

fn confirmed_deposit_payload() -> String {
    serde_json::json!({
        "id": "evt_100",
        "kind": "wallet.transfer.confirmed",
        "data": {
            "id": "xfer_100",
            "walletId": "cw_abc",
            "txHash": "0x9f2a",
            "direction": "In",
            "rawAmount": "2500000",
            "contractAddress": "0x1c7d4b196cb0c7b01d743fbc6116a902379c7238",
            "fromAddress": "0x3333333333333333333333333333333333333333",
            "toAddress": "0x4444444444444444444444444444444444444444"
        },
        "timestamp": "2026-05-01T12:00:00Z"
    })
    .to_string()
}

#[test]
fn test_signature_round_trip() {
    let body = confirmed_deposit_payload();
    let signature = sign_payload(body.as_bytes(), "whsec_test");

    assert!(verify_signature(body.as_bytes(), "whsec_test", &signature));
    assert!(!verify_signature(body.as_bytes(), "whsec_other", &signature));
    assert!(!verify_signature(b"{}", "whsec_test", &signature));
    assert!(!verify_signature(body.as_bytes(), "whsec_test", "00ff"));
}

#[test]
fn test_envelope_kinds() {
    let envelope = parse_envelope(confirmed_deposit_payload().as_bytes()).unwrap();
    assert_eq!(envelope.kind, EventKind::TransferConfirmed);
    assert_eq!(envelope.data.id, "xfer_100");
    assert_eq!(envelope.data.wallet_id, "cw_abc");
    assert!(envelope.data.is_inbound());

    for (raw, expected) in [
        ("wallet.transfer.inbound", EventKind::InboundTransfer),
        ("wallet.transfer.completed", EventKind::TransferCompleted),
        ("wallet.transfer.failed", EventKind::TransferFailed),
        ("wallet.created", EventKind::Unknown),
    ] {
        let body = serde_json::json!({
            "id": "evt_x",
            "kind": raw,
            "data": {"id": "xfer_x", "walletId": "cw_x"}
        })
        .to_string();
        let envelope: WebhookEnvelope = parse_envelope(body.as_bytes()).unwrap();
        assert_eq!(envelope.kind, expected, "kind string: {}", raw);
    }
}

#[test]
fn test_outcome_event_without_wallet_id_parses() {
    // Outcome events for outbound transfers carry only the transfer id
    // and an optional tx hash; they must still reach the reconciler.
    let body = serde_json::json!({
        "id": "evt_fail",
        "kind": "wallet.transfer.failed",
        "data": {"id": "xfer_fail", "txHash": "0xdead"}
    })
    .to_string();

    let envelope = parse_envelope(body.as_bytes()).unwrap();
    assert_eq!(envelope.kind, EventKind::TransferFailed);
    assert_eq!(envelope.data.id, "xfer_fail");
    assert_eq!(envelope.data.wallet_id, "");
    assert_eq!(envelope.data.tx_hash.as_deref(), Some("0xdead"));
}

#[test]
fn test_signature_over_arbitrary_bytes() {
    // Verification runs over the raw body before any parsing, so it must
    // hold for payloads that are not valid UTF-8.
    let payload: &[u8] = &[0x80, 0xff, 0x00, 0x42];
    let signature = sign_payload(payload, "whsec_test");
    assert!(verify_signature(payload, "whsec_test", &signature));
    assert!(!verify_signature(payload, "whsec_other", &signature));
}

#[test]
fn test_malformed_envelope_rejected() {
    assert!(parse_envelope(b"not json").is_err());
    assert!(parse_envelope(br#"{"id": "evt_1"}"#).is_err());
}

#[test]
fn test_outbound_direction_not_inbound() {
    let body = serde_json::json!({
        "id": "evt_out",
        "kind": "wallet.transfer.confirmed",
        "data": {
            "id": "xfer_out",
            "walletId": "cw_abc",
            "direction": "Out",
            "rawAmount": "1000000"
        }
    })
    .to_string();

    let envelope = parse_envelope(body.as_bytes()).unwrap();
    assert!(!envelope.data.is_inbound());
}
