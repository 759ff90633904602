//! 编排控制 Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use serde_json::Value;
use shared::{ApiResponse, AppResult, OrderRecord};

use crate::core::ServerState;
use crate::dispatch::DispatchReport;
use crate::tracking::{ConfirmSummary, PollSummary};

/// 执行一次完整调度：拉单、选承运商、建运单
pub async fn dispatch(
    State(state): State<ServerState>,
) -> AppResult<Json<ApiResponse<DispatchReport>>> {
    let report = state.dispatcher.dispatch().await?;
    Ok(Json(ApiResponse::success(report)))
}

/// 把所有 POSTED 订单的 tracking 回传 marketplace
pub async fn confirm_tracking(
    State(state): State<ServerState>,
) -> Json<ApiResponse<ConfirmSummary>> {
    let summary = state.reconciler.confirm_posted().await;
    Json(ApiResponse::success(summary))
}

/// 手动触发一轮 tracking 轮询
pub async fn poll(State(state): State<ServerState>) -> Json<ApiResponse<PollSummary>> {
    let summary = state.reconciler.poll_once().await;
    Json(ApiResponse::success(summary))
}

/// 轮询单个订单
pub async fn poll_order(
    State(state): State<ServerState>,
    Path(order_id): Path<String>,
) -> AppResult<Json<ApiResponse<OrderRecord>>> {
    let record = state.reconciler.poll_specific_order(&order_id).await?;
    Ok(Json(ApiResponse::success(record)))
}

#[derive(Serialize)]
pub struct PollerResponse {
    /// 本次调用是否改变了轮询器状态
    changed: bool,
    running: bool,
}

/// 启动后台轮询（幂等）
pub async fn start_poller(State(state): State<ServerState>) -> Json<ApiResponse<PollerResponse>> {
    let changed = state.poller.start().await;
    Json(ApiResponse::success(PollerResponse {
        changed,
        running: true,
    }))
}

/// 停止后台轮询（幂等）
pub async fn stop_poller(State(state): State<ServerState>) -> Json<ApiResponse<PollerResponse>> {
    let changed = state.poller.stop().await;
    Json(ApiResponse::success(PollerResponse {
        changed,
        running: false,
    }))
}

/// 编排状态概览
#[derive(Serialize)]
pub struct StatusResponse {
    orders_total: usize,
    counts_by_state: std::collections::HashMap<String, usize>,
    carriers: Vec<String>,
    /// 规则集概览（按求值顺序）
    rules: Vec<Value>,
    poller_running: bool,
    poll_interval_secs: u64,
    idempotency_cached: usize,
}

pub async fn status(State(state): State<ServerState>) -> Json<ApiResponse<StatusResponse>> {
    Json(ApiResponse::success(StatusResponse {
        orders_total: state.store.len(),
        counts_by_state: state.store.counts_by_state(),
        carriers: state.carriers.codes(),
        rules: state.selector.summary(),
        poller_running: state.poller.is_running().await,
        poll_interval_secs: state.poller.interval_secs(),
        idempotency_cached: state.guard.len().await,
    }))
}
