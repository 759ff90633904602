//! 订单查询 Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use shared::{ApiResponse, AppError, AppResult, InternalState, OrderFilter, OrderRecord};

use crate::core::ServerState;

/// 列表查询参数
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// 生命周期状态，如 `POSTED`
    pub state: Option<String>,
    /// 承运商代码，如 `tipsa`
    pub carrier: Option<String>,
}

fn parse_state(value: &str) -> AppResult<InternalState> {
    serde_json::from_value(serde_json::Value::String(value.to_uppercase()))
        .map_err(|_| AppError::validation(format!("unknown lifecycle state: {value}")))
}

/// 订单列表
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<OrderRecord>>>> {
    let filter = OrderFilter {
        carrier_code: query.carrier,
        internal_state: query.state.as_deref().map(parse_state).transpose()?,
        ..Default::default()
    };
    Ok(Json(ApiResponse::success(state.store.query(&filter))))
}

/// 订单详情
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(order_id): Path<String>,
) -> AppResult<Json<ApiResponse<OrderRecord>>> {
    let record = state
        .store
        .get(&order_id)
        .ok_or_else(|| AppError::order_not_found(&order_id))?;
    Ok(Json(ApiResponse::success(record)))
}

/// 下载运单标签
pub async fn get_label(
    State(state): State<ServerState>,
    Path(order_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let record = state
        .store
        .get(&order_id)
        .ok_or_else(|| AppError::order_not_found(&order_id))?;

    let (Some(carrier_code), Some(expedition_id)) =
        (record.carrier_code.as_deref(), record.expedition_id.as_deref())
    else {
        return Err(AppError::with_message(
            shared::ErrorCode::MissingTrackingNumber,
            format!("order {order_id} has no shipment yet"),
        ));
    };

    let adapter = state.carriers.require(carrier_code)?;
    let pdf = adapter.get_shipment_label(expedition_id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{expedition_id}.pdf\""),
            ),
        ],
        pdf,
    ))
}
