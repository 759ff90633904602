//! 编排控制接口
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/v1/orchestrator/dispatch | POST | 执行一次完整调度 |
//! | /api/v1/orchestrator/confirm-tracking | POST | 确认所有 POSTED 订单 |
//! | /api/v1/orchestrator/poll | POST | 手动触发一轮轮询 |
//! | /api/v1/orchestrator/poll/{order_id} | POST | 轮询单个订单 |
//! | /api/v1/orchestrator/poller/start | POST | 启动后台轮询 |
//! | /api/v1/orchestrator/poller/stop | POST | 停止后台轮询 |
//! | /api/v1/orchestrator/status | GET | 编排状态概览 |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/v1/orchestrator", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/dispatch", post(handler::dispatch))
        .route("/confirm-tracking", post(handler::confirm_tracking))
        .route("/poll", post(handler::poll))
        .route("/poll/{order_id}", post(handler::poll_order))
        .route("/poller/start", post(handler::start_poller))
        .route("/poller/stop", post(handler::stop_poller))
        .route("/status", get(handler::status))
}
