//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`orchestrator`] - 调度、发货确认、轮询控制
//! - [`orders`] - 订单查询
//! - [`webhooks`] - 承运商 webhook 接入

pub mod health;
pub mod orchestrator;
pub mod orders;
pub mod webhooks;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::core::ServerState;

/// 组装全部路由
pub fn router(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(orchestrator::router())
        .merge(orders::router())
        .merge(webhooks::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
