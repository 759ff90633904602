//! Tracking 对账
//!
//! 承运商状态（CREATED / IN_TRANSIT / DELIVERED / INCIDENT...）与
//! 生命周期状态的映射集中在这里，webhook 和轮询共用同一条路径。
//! 落后于当前状态的事件按无操作处理，不报错也不回退。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::{
    AppError, AppResult, InternalState, OrderFilter, OrderPatch, OrderRecord, WebhookEvent,
};

use crate::adapters::{CarrierRegistry, MarketplaceAdapter};
use crate::store::OrderStore;
use crate::tracking::webhook::WebhookAuthenticator;

/// webhook 处理结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// 事件已入账
    Processed {
        order_id: String,
        state: InternalState,
    },
    /// 事件落后于当前状态，按无操作处理
    Stale { order_id: String },
    /// 同一事件的重复投递
    Duplicate { event_id: String },
    /// 引用的运单在本地找不到
    UnknownReference { reference: String },
}

/// 发货确认批量结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfirmSummary {
    pub confirmed: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
}

/// 一轮轮询的汇总
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollSummary {
    pub orders_polled: usize,
    pub updates: usize,
    pub errors: usize,
}

pub struct TrackingReconciler {
    store: Arc<OrderStore>,
    marketplace: Arc<dyn MarketplaceAdapter>,
    carriers: Arc<CarrierRegistry>,
    auth: Arc<WebhookAuthenticator>,
}

impl TrackingReconciler {
    pub fn new(
        store: Arc<OrderStore>,
        marketplace: Arc<dyn MarketplaceAdapter>,
        carriers: Arc<CarrierRegistry>,
        auth: Arc<WebhookAuthenticator>,
    ) -> Self {
        Self {
            store,
            marketplace,
            carriers,
            auth,
        }
    }

    /// 承运商状态词汇到生命周期状态的映射
    ///
    /// 未知状态返回 None，只记录原文不动状态机
    fn map_carrier_status(status: &str) -> Option<InternalState> {
        match status.to_ascii_uppercase().as_str() {
            "IN_TRANSIT" | "PICKED_UP" | "OUT_FOR_DELIVERY" | "AT_HUB" => {
                Some(InternalState::Confirmed)
            }
            "DELIVERED" => Some(InternalState::Delivered),
            "INCIDENT" | "RETURNED" | "LOST" | "CANCELLED" => Some(InternalState::Failed),
            _ => None,
        }
    }

    /// 处理一条承运商 webhook
    ///
    /// 验签、判重、按引用反查订单、入账状态变化。
    /// 除验签失败外，其余情况都返回 Ok 的业务结果。
    pub async fn process_webhook(
        &self,
        carrier: &str,
        body: &[u8],
        signature: &str,
        timestamp: &str,
    ) -> AppResult<WebhookOutcome> {
        self.auth.verify(carrier, body, signature, timestamp)?;

        let event: WebhookEvent = serde_json::from_slice(body)
            .map_err(|e| AppError::validation(format!("malformed webhook payload: {e}")))?;

        let event_id = event.identity();
        if self.auth.is_processed(&event_id) {
            tracing::info!(carrier, event_id = %event_id, "duplicate webhook delivery ignored");
            return Ok(WebhookOutcome::Duplicate { event_id });
        }

        let Some(reference) = event.reference() else {
            return Err(AppError::validation(
                "webhook carries neither tracking number nor expedition id",
            ));
        };

        // 找不到订单不消耗事件 id，调度落地后的重投还能入账
        let Some(record) = self.store.find_by_reference(reference) else {
            tracing::warn!(carrier, reference, "webhook references unknown shipment");
            return Ok(WebhookOutcome::UnknownReference {
                reference: reference.to_string(),
            });
        };

        let outcome = match self.record_status_change(&record, &event.status, "WEBHOOK")? {
            Some(updated) => WebhookOutcome::Processed {
                order_id: updated.order_id,
                state: updated.internal_state,
            },
            None => WebhookOutcome::Stale {
                order_id: record.order_id,
            },
        };
        self.auth.mark_processed(&event_id);
        Ok(outcome)
    }

    /// 入账一次承运商状态变化
    ///
    /// 会回退状态机的事件按无操作处理，返回 Ok(None)。
    pub fn record_status_change(
        &self,
        record: &OrderRecord,
        carrier_status: &str,
        source: &str,
    ) -> AppResult<Option<OrderRecord>> {
        let target = Self::map_carrier_status(carrier_status);

        if let Some(state) = target
            && !record.internal_state.can_transition_to(state)
        {
            tracing::info!(
                order_id = %record.order_id,
                current = %record.internal_state,
                carrier_status,
                "stale tracking event, no-op"
            );
            return Ok(None);
        }

        let patch = OrderPatch {
            carrier_status: Some(carrier_status.to_string()),
            internal_state: target,
            ..Default::default()
        }
        .with_event(format!("{source}:{carrier_status}"));

        let updated = self.store.apply(&record.order_id, patch)?;
        tracing::info!(
            order_id = %updated.order_id,
            carrier_status,
            state = %updated.internal_state,
            source,
            "tracking status recorded"
        );
        Ok(Some(updated))
    }

    /// 把一个 POSTED 订单的 tracking 回传 marketplace 并确认发货
    pub async fn confirm_shipment(&self, order_id: &str) -> AppResult<OrderRecord> {
        let record = self
            .store
            .get(order_id)
            .ok_or_else(|| AppError::order_not_found(order_id))?;

        let (Some(tracking), Some(code), Some(name)) = (
            record.tracking_number.as_deref(),
            record.carrier_code.as_deref(),
            record.carrier_name.as_deref(),
        ) else {
            return Err(AppError::with_message(
                shared::ErrorCode::MissingTrackingNumber,
                format!("order {order_id} has no shipment to confirm"),
            ));
        };

        self.marketplace
            .update_order_tracking(order_id, code, name, tracking)
            .await?;
        self.marketplace.update_order_ship(order_id).await?;

        let patch = OrderPatch {
            marketplace_status: Some("SHIPPED".to_string()),
            internal_state: Some(InternalState::AwaitingTracking),
            ..Default::default()
        }
        .with_event("TRACKING_CONFIRMED");
        self.store.apply(order_id, patch)
    }

    /// 对所有 POSTED 订单执行发货确认
    pub async fn confirm_posted(&self) -> ConfirmSummary {
        let posted = self.store.query(&OrderFilter {
            internal_state: Some(InternalState::Posted),
            ..Default::default()
        });

        let mut summary = ConfirmSummary::default();
        for record in posted {
            match self.confirm_shipment(&record.order_id).await {
                Ok(_) => summary.confirmed += 1,
                Err(e) => {
                    summary.failed += 1;
                    summary.errors.push(format!("{}: {}", record.order_id, e));
                }
            }
        }
        summary
    }

    /// 轮询所有在途运单
    ///
    /// 只查有 tracking 且未到终态的订单；承运商状态没变化时不动记录。
    pub async fn poll_once(&self) -> PollSummary {
        let active = self.store.query(&OrderFilter {
            has_tracking: true,
            exclude_terminal: true,
            ..Default::default()
        });

        let mut summary = PollSummary {
            orders_polled: active.len(),
            ..Default::default()
        };

        for record in active {
            match self.poll_record(&record).await {
                Ok(Some(_)) => summary.updates += 1,
                Ok(None) => {}
                Err(e) => {
                    summary.errors += 1;
                    tracing::warn!(order_id = %record.order_id, error = %e, "poll failed");
                }
            }
        }

        tracing::info!(
            polled = summary.orders_polled,
            updates = summary.updates,
            errors = summary.errors,
            "tracking poll cycle finished"
        );
        summary
    }

    /// 轮询单个订单
    pub async fn poll_specific_order(&self, order_id: &str) -> AppResult<OrderRecord> {
        let record = self
            .store
            .get(order_id)
            .ok_or_else(|| AppError::order_not_found(order_id))?;

        if record.tracking_number.is_none() {
            return Err(AppError::with_message(
                shared::ErrorCode::MissingTrackingNumber,
                format!("order {order_id} has no tracking number yet"),
            ));
        }

        match self.poll_record(&record).await? {
            Some(updated) => Ok(updated),
            None => Ok(record),
        }
    }

    /// 拉取一个订单的承运商状态并入账差异
    async fn poll_record(&self, record: &OrderRecord) -> AppResult<Option<OrderRecord>> {
        let carrier_code = record
            .carrier_code
            .as_deref()
            .ok_or_else(|| AppError::internal("record has tracking but no carrier"))?;
        let tracking = record
            .tracking_number
            .as_deref()
            .ok_or_else(|| AppError::internal("record has no tracking number"))?;

        let adapter = self.carriers.require(carrier_code)?;
        let status = adapter.get_shipment_status(tracking).await?;

        if record.carrier_status.as_deref() == Some(status.status.as_str()) {
            return Ok(None);
        }
        self.record_status_change(record, &status.status, "POLL")
    }
}
