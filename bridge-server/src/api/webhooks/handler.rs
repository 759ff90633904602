//! Webhook Handlers
//!
//! 无论验签还是处理结果如何，统一回 202：承运商的投递端只认
//! 2xx，回错误码只会招来无意义的重投。失败原因落日志。

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use serde_json::{Value, json};

use crate::core::ServerState;
use crate::tracking::WebhookOutcome;

const SIGNATURE_HEADER: &str = "x-signature";
const TIMESTAMP_HEADER: &str = "x-timestamp";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// 接收承运商推送
pub async fn receive(
    State(state): State<ServerState>,
    Path(carrier): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let signature = header_str(&headers, SIGNATURE_HEADER);
    let timestamp = header_str(&headers, TIMESTAMP_HEADER);

    let ack = |detail: Value| (StatusCode::ACCEPTED, Json(json!({ "received": true, "result": detail })));

    let (Some(signature), Some(timestamp)) = (signature, timestamp) else {
        tracing::warn!(carrier = %carrier, "webhook missing signature or timestamp header");
        return ack(json!("rejected"));
    };

    match state
        .reconciler
        .process_webhook(&carrier, &body, signature, timestamp)
        .await
    {
        Ok(WebhookOutcome::Processed { order_id, state }) => {
            tracing::info!(carrier = %carrier, order_id = %order_id, state = %state, "webhook processed");
            ack(json!("processed"))
        }
        Ok(WebhookOutcome::Stale { order_id }) => {
            tracing::info!(carrier = %carrier, order_id = %order_id, "stale webhook ignored");
            ack(json!("stale"))
        }
        Ok(WebhookOutcome::Duplicate { event_id }) => {
            tracing::info!(carrier = %carrier, event_id = %event_id, "duplicate webhook ignored");
            ack(json!("duplicate"))
        }
        Ok(WebhookOutcome::UnknownReference { reference }) => {
            tracing::warn!(carrier = %carrier, reference = %reference, "webhook for unknown shipment");
            ack(json!("unknown_reference"))
        }
        Err(e) => {
            tracing::warn!(carrier = %carrier, error = %e, "webhook rejected");
            ack(json!("rejected"))
        }
    }
}
