//! 承运商 webhook 接入
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/v1/webhooks/{carrier} | POST | 接收承运商推送 |
//!
//! # 请求头
//!
//! | Header | 说明 |
//! |--------|------|
//! | X-Signature | 原始报文字节的 HMAC-SHA256 (hex) |
//! | X-Timestamp | 事件时间 (RFC3339) |

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/v1/webhooks/{carrier}", post(handler::receive))
}
