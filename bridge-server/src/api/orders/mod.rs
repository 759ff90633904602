//! 订单查询接口
//!
//! 只读视图，所有变更都经过调度器与对账器。
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/v1/orders | GET | 订单列表（可按状态/承运商过滤） |
//! | /api/v1/orders/{order_id} | GET | 订单详情 |
//! | /api/v1/orders/{order_id}/label | GET | 下载运单标签 (PDF) |

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/v1/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list))
        .route("/{order_id}", get(handler::get_by_id))
        .route("/{order_id}/label", get(handler::get_label))
}
