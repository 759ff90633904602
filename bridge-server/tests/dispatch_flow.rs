//! 调度流程集成测试
//!
//! 覆盖：规则分组、整组失败隔离、重试语义、重复调度去重、发货确认。

mod common;

use std::sync::atomic::Ordering;

use common::{FakeCarrier, FakeMarketplace, build_state, make_order};
use shared::{AppError, InternalState};

#[tokio::test]
async fn test_dispatch_partitions_by_rules() {
    // 2kg 国内 -> tipsa, 25kg -> ups, 国际 -> dhl
    let marketplace = FakeMarketplace::with_orders(vec![
        make_order("MIR-1", 2.0, "ES"),
        make_order("MIR-2", 25.0, "ES"),
        make_order("MIR-3", 0.5, "FR"),
    ]);
    let tipsa = FakeCarrier::new("tipsa");
    let ups = FakeCarrier::new("ups");
    let dhl = FakeCarrier::new("dhl");
    let state = build_state(marketplace, vec![tipsa.clone(), ups.clone(), dhl.clone()]);

    let report = state.dispatcher.dispatch().await.unwrap();

    assert!(report.success);
    assert_eq!(report.orders_processed, 3);
    assert_eq!(report.shipments_created, 3);
    assert_eq!(report.carrier_breakdown.len(), 3);
    assert_eq!(tipsa.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(ups.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(dhl.create_calls.load(Ordering::SeqCst), 1);

    let record = state.store.get("MIR-2").unwrap();
    assert_eq!(record.internal_state, InternalState::Posted);
    assert_eq!(record.carrier_code.as_deref(), Some("ups"));
    assert!(record.tracking_number.is_some());
    assert_eq!(record.last_event.as_deref(), Some("SHIPMENT_CREATED"));
}

#[tokio::test]
async fn test_group_failure_does_not_affect_other_carriers() {
    let marketplace = FakeMarketplace::with_orders(vec![
        make_order("MIR-1", 2.0, "ES"),
        make_order("MIR-2", 25.0, "ES"),
    ]);
    let tipsa = FakeCarrier::new("tipsa");
    let ups = FakeCarrier::new("ups");
    ups.fail_with(AppError::carrier("HTTP 503")).await;
    let state = build_state(marketplace, vec![tipsa.clone(), ups.clone()]);

    let report = state.dispatcher.dispatch().await.unwrap();

    assert!(!report.success);
    assert_eq!(report.shipments_created, 1);
    assert!(report.carrier_breakdown["ups"].error.is_some());
    assert!(report.carrier_breakdown["tipsa"].error.is_none());

    // tipsa 组正常入账
    assert_eq!(
        state.store.get("MIR-1").unwrap().internal_state,
        InternalState::Posted
    );
    // 可重试失败保持 PENDING_POST 并累加重试计数
    let failed = state.store.get("MIR-2").unwrap();
    assert_eq!(failed.internal_state, InternalState::PendingPost);
    assert_eq!(failed.retry_count, 1);
    assert!(failed.error_message.is_some());
}

#[tokio::test]
async fn test_fatal_failure_marks_order_failed() {
    let marketplace = FakeMarketplace::with_orders(vec![make_order("MIR-1", 25.0, "ES")]);
    let ups = FakeCarrier::new("ups");
    ups.fail_with(AppError::validation("recipient postcode rejected"))
        .await;
    let state = build_state(marketplace.clone(), vec![ups]);

    let report = state.dispatcher.dispatch().await.unwrap();

    assert!(!report.success);
    let record = state.store.get("MIR-1").unwrap();
    assert_eq!(record.internal_state, InternalState::Failed);
    assert_eq!(record.retry_count, 0);

    // 终态失败回报给 marketplace
    let updates = marketplace.status_updates.lock().await;
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, "MIR-1");
    assert_eq!(updates[0].1, "INCIDENT");
}

#[tokio::test]
async fn test_concurrent_dispatch_creates_once() {
    let marketplace = FakeMarketplace::with_orders(vec![make_order("MIR-1", 2.0, "ES")]);
    let tipsa = FakeCarrier::new("tipsa");
    // 拉长创建耗时，让两次调度的创建窗口重叠
    tipsa
        .delay_creates(std::time::Duration::from_millis(100))
        .await;
    let state = build_state(marketplace, vec![tipsa.clone()]);

    let (first, second) = tokio::join!(state.dispatcher.dispatch(), state.dispatcher.dispatch());
    let created = first.unwrap().shipments_created + second.unwrap().shipments_created;

    assert_eq!(created, 1);
    assert_eq!(tipsa.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        state.store.get("MIR-1").unwrap().internal_state,
        InternalState::Posted
    );
}

#[tokio::test]
async fn test_unconfigured_carrier_fails_group() {
    // 重件路由到 ups，但注册表里没有 ups
    let marketplace = FakeMarketplace::with_orders(vec![make_order("MIR-1", 25.0, "ES")]);
    let state = build_state(marketplace, vec![FakeCarrier::new("tipsa")]);

    let report = state.dispatcher.dispatch().await.unwrap();

    assert!(!report.success);
    assert!(report.carrier_breakdown["ups"].error.is_some());
    assert_eq!(
        state.store.get("MIR-1").unwrap().internal_state,
        InternalState::Failed
    );
}

#[tokio::test]
async fn test_redispatch_reuses_created_shipments() {
    let marketplace = FakeMarketplace::with_orders(vec![make_order("MIR-1", 2.0, "ES")]);
    let tipsa = FakeCarrier::new("tipsa");
    let state = build_state(marketplace, vec![tipsa.clone()]);

    let first = state.dispatcher.dispatch().await.unwrap();
    assert_eq!(first.shipments_created, 1);
    let tracking_before = state.store.get("MIR-1").unwrap().tracking_number;

    // marketplace 还没把订单翻到 SHIPPED，第二次调度会再拉到它
    let second = state.dispatcher.dispatch().await.unwrap();
    assert!(second.success);
    assert_eq!(second.shipments_created, 0);
    // 承运商只被打过一次
    assert_eq!(tipsa.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        state.store.get("MIR-1").unwrap().tracking_number,
        tracking_before
    );
}

#[tokio::test]
async fn test_retry_after_transient_failure_succeeds() {
    let marketplace = FakeMarketplace::with_orders(vec![make_order("MIR-1", 2.0, "ES")]);
    let tipsa = FakeCarrier::new("tipsa");
    tipsa.fail_with(AppError::timeout("slow carrier")).await;
    let state = build_state(marketplace, vec![tipsa.clone()]);

    let first = state.dispatcher.dispatch().await.unwrap();
    assert!(!first.success);
    assert_eq!(
        state.store.get("MIR-1").unwrap().internal_state,
        InternalState::PendingPost
    );

    // 故障恢复后重跑，失败没有进过去重缓存
    *tipsa.fail_bulk_with.lock().await = None;
    let second = state.dispatcher.dispatch().await.unwrap();
    assert!(second.success);
    assert_eq!(second.shipments_created, 1);
    assert_eq!(
        state.store.get("MIR-1").unwrap().internal_state,
        InternalState::Posted
    );
}

#[tokio::test]
async fn test_confirm_posted_pushes_tracking_to_marketplace() {
    let marketplace = FakeMarketplace::with_orders(vec![
        make_order("MIR-1", 2.0, "ES"),
        make_order("MIR-2", 25.0, "ES"),
    ]);
    let state = build_state(
        marketplace.clone(),
        vec![FakeCarrier::new("tipsa"), FakeCarrier::new("ups")],
    );

    state.dispatcher.dispatch().await.unwrap();
    let summary = state.reconciler.confirm_posted().await;

    assert_eq!(summary.confirmed, 2);
    assert_eq!(summary.failed, 0);

    let pushes = marketplace.tracking_pushes.lock().await;
    assert_eq!(pushes.len(), 2);
    let shipped = marketplace.shipped.lock().await;
    assert_eq!(shipped.len(), 2);

    let record = state.store.get("MIR-1").unwrap();
    assert_eq!(record.internal_state, InternalState::AwaitingTracking);
    assert_eq!(record.marketplace_status, "SHIPPED");
}

#[tokio::test]
async fn test_confirm_requires_tracking() {
    let marketplace = FakeMarketplace::with_orders(vec![make_order("MIR-1", 2.0, "ES")]);
    let state = build_state(marketplace, vec![FakeCarrier::new("tipsa")]);

    // 只拉单不创建运单
    state.dispatcher.fetch_pending().await.unwrap();

    let err = state.reconciler.confirm_shipment("MIR-1").await.unwrap_err();
    assert_eq!(err.code, shared::ErrorCode::MissingTrackingNumber);
}
