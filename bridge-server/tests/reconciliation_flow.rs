//! 对账流程集成测试
//!
//! 覆盖：webhook 验签与入账、重放与乱序投递、轮询差异更新、
//! 单订单轮询的错误语义。

mod common;

use std::sync::atomic::Ordering;

use common::{FakeCarrier, FakeMarketplace, build_state, make_order};
use shared::{ErrorCode, InternalState};

use bridge_server::core::ServerState;
use bridge_server::tracking::WebhookOutcome;

/// 建好一个已创建运单的状态，返回 (state, tracking_number)
async fn posted_state(carrier: std::sync::Arc<FakeCarrier>) -> (ServerState, String) {
    let marketplace = FakeMarketplace::with_orders(vec![make_order("MIR-1", 2.0, "ES")]);
    let state = build_state(marketplace, vec![carrier]);
    state.dispatcher.dispatch().await.unwrap();
    let tracking = state
        .store
        .get("MIR-1")
        .unwrap()
        .tracking_number
        .unwrap();
    (state, tracking)
}

fn webhook_body(event_id: &str, tracking: &str, status: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "event_id": event_id,
        "event_type": "status_update",
        "tracking_number": tracking,
        "status": status,
    }))
    .unwrap()
}

async fn deliver(
    state: &ServerState,
    carrier: &str,
    body: &[u8],
) -> shared::AppResult<WebhookOutcome> {
    let timestamp = chrono::Utc::now().to_rfc3339();
    let signature = state.webhook_auth.sign(carrier, body).unwrap();
    state
        .reconciler
        .process_webhook(carrier, body, &signature, &timestamp)
        .await
}

#[tokio::test]
async fn test_signed_webhook_advances_order() {
    let (state, tracking) = posted_state(FakeCarrier::new("tipsa")).await;

    let body = webhook_body("evt-1", &tracking, "IN_TRANSIT");
    let outcome = deliver(&state, "tipsa", &body).await.unwrap();

    assert!(matches!(outcome, WebhookOutcome::Processed { .. }));
    let record = state.store.get("MIR-1").unwrap();
    assert_eq!(record.internal_state, InternalState::Confirmed);
    assert_eq!(record.carrier_status.as_deref(), Some("IN_TRANSIT"));
}

#[tokio::test]
async fn test_replayed_webhook_is_noop() {
    let (state, tracking) = posted_state(FakeCarrier::new("tipsa")).await;

    let body = webhook_body("evt-1", &tracking, "IN_TRANSIT");
    deliver(&state, "tipsa", &body).await.unwrap();
    let before = state.store.get("MIR-1").unwrap();

    let outcome = deliver(&state, "tipsa", &body).await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::Duplicate { .. }));

    // 重放不触碰记录
    let after = state.store.get("MIR-1").unwrap();
    assert_eq!(after.updated_at, before.updated_at);
    assert_eq!(after.internal_state, before.internal_state);
}

#[tokio::test]
async fn test_out_of_order_webhook_does_not_regress() {
    let (state, tracking) = posted_state(FakeCarrier::new("tipsa")).await;

    deliver(&state, "tipsa", &webhook_body("evt-1", &tracking, "DELIVERED"))
        .await
        .unwrap();
    assert_eq!(
        state.store.get("MIR-1").unwrap().internal_state,
        InternalState::Delivered
    );

    // 晚到的在途事件按无操作处理
    let outcome = deliver(&state, "tipsa", &webhook_body("evt-2", &tracking, "IN_TRANSIT"))
        .await
        .unwrap();
    assert!(matches!(outcome, WebhookOutcome::Stale { .. }));
    assert_eq!(
        state.store.get("MIR-1").unwrap().internal_state,
        InternalState::Delivered
    );
}

#[tokio::test]
async fn test_bad_signature_rejected() {
    let (state, tracking) = posted_state(FakeCarrier::new("tipsa")).await;
    let body = webhook_body("evt-1", &tracking, "IN_TRANSIT");
    let timestamp = chrono::Utc::now().to_rfc3339();

    let err = state
        .reconciler
        .process_webhook("tipsa", &body, "deadbeef", &timestamp)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::SignatureInvalid);
    // 验签失败不消耗事件 id，同一事件之后仍可正常投递
    let outcome = deliver(&state, "tipsa", &body).await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::Processed { .. }));
}

#[tokio::test]
async fn test_unknown_reference_is_acknowledged() {
    let (state, _) = posted_state(FakeCarrier::new("tipsa")).await;

    let body = webhook_body("evt-9", "UNKNOWN-TRK", "IN_TRANSIT");
    let outcome = deliver(&state, "tipsa", &body).await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::UnknownReference { .. }));
}

#[tokio::test]
async fn test_webhook_racing_ahead_of_dispatch_can_be_redelivered() {
    let marketplace = FakeMarketplace::with_orders(vec![make_order("MIR-1", 2.0, "ES")]);
    let state = build_state(marketplace, vec![FakeCarrier::new("tipsa")]);

    // 运单还没创建，webhook 先到
    let early = webhook_body("evt-1", "TIP-EARLY-1", "IN_TRANSIT");
    let outcome = deliver(&state, "tipsa", &early).await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::UnknownReference { .. }));

    state.dispatcher.dispatch().await.unwrap();
    let tracking = state.store.get("MIR-1").unwrap().tracking_number.unwrap();

    // 找不到订单的投递不消耗事件 id，承运商重投同一事件能正常入账
    let redelivery = webhook_body("evt-1", &tracking, "IN_TRANSIT");
    let outcome = deliver(&state, "tipsa", &redelivery).await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::Processed { .. }));
    assert_eq!(
        state.store.get("MIR-1").unwrap().internal_state,
        InternalState::Confirmed
    );
}

#[tokio::test]
async fn test_incident_webhook_fails_order() {
    let (state, tracking) = posted_state(FakeCarrier::new("tipsa")).await;

    deliver(&state, "tipsa", &webhook_body("evt-1", &tracking, "INCIDENT"))
        .await
        .unwrap();
    let record = state.store.get("MIR-1").unwrap();
    assert_eq!(record.internal_state, InternalState::Failed);
    assert_eq!(record.carrier_status.as_deref(), Some("INCIDENT"));
}

#[tokio::test]
async fn test_unknown_status_recorded_without_transition() {
    let (state, tracking) = posted_state(FakeCarrier::new("tipsa")).await;

    deliver(
        &state,
        "tipsa",
        &webhook_body("evt-1", &tracking, "CUSTOMS_HOLD"),
    )
    .await
    .unwrap();
    let record = state.store.get("MIR-1").unwrap();
    assert_eq!(record.internal_state, InternalState::Posted);
    assert_eq!(record.carrier_status.as_deref(), Some("CUSTOMS_HOLD"));
}

#[tokio::test]
async fn test_poll_once_records_only_diffs() {
    let tipsa = FakeCarrier::new("tipsa");
    let (state, _) = posted_state(tipsa.clone()).await;

    // 承运商仍报 CREATED，没有差异
    let summary = state.reconciler.poll_once().await;
    assert_eq!(summary.orders_polled, 1);
    assert_eq!(summary.updates, 0);

    tipsa.report("DELIVERED").await;
    let summary = state.reconciler.poll_once().await;
    assert_eq!(summary.updates, 1);
    assert_eq!(
        state.store.get("MIR-1").unwrap().internal_state,
        InternalState::Delivered
    );

    // 到终态后不再轮询
    let summary = state.reconciler.poll_once().await;
    assert_eq!(summary.orders_polled, 0);
}

#[tokio::test]
async fn test_poll_specific_order_errors() {
    let marketplace = FakeMarketplace::with_orders(vec![make_order("MIR-1", 2.0, "ES")]);
    let state = build_state(marketplace, vec![FakeCarrier::new("tipsa")]);

    let err = state
        .reconciler
        .poll_specific_order("MIR-404")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::OrderNotFound);

    // 登记了但还没有运单
    state.dispatcher.fetch_pending().await.unwrap();
    let err = state
        .reconciler
        .poll_specific_order("MIR-1")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingTrackingNumber);
}

#[tokio::test]
async fn test_poller_start_stop_idempotent() {
    let tipsa = FakeCarrier::new("tipsa");
    let (state, _) = posted_state(tipsa.clone()).await;

    assert!(state.poller.start().await);
    assert!(!state.poller.start().await);
    assert!(state.poller.is_running().await);

    assert!(state.poller.stop().await);
    assert!(!state.poller.stop().await);
    assert!(!state.poller.is_running().await);
    // 循环退出后没有幽灵轮询
    let polled = tipsa.status_calls.load(Ordering::SeqCst);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(tipsa.status_calls.load(Ordering::SeqCst), polled);
}
