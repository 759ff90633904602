//! 调度主流程
//!
//! 一次调度分三步：
//!
//! 1. 分页拉取 marketplace 待处理订单，登记进状态存储
//! 2. 规则引擎按订单属性分组到承运商
//! 3. 逐承运商批量创建运单，结果回写状态存储
//!
//! 单个承运商整组失败不影响其他组：可重试的失败保持
//! PENDING_POST 并累加重试计数，不可重试的失败转 FAILED。

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::{
    AppResult, InternalState, MarketplaceOrder, OrderPatch,
};

use crate::adapters::{CarrierRegistry, MarketplaceAdapter};
use crate::dispatch::idempotency::{Claim, IdempotencyGuard};
use crate::rules::CarrierSelector;
use crate::store::OrderStore;

/// 单个承运商的调度结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CarrierBreakdown {
    /// 分到该承运商的订单数
    pub orders: usize,
    /// 本次新建的运单数（缓存命中不计入）
    pub created: usize,
    /// 单个订单级失败数
    pub failed: usize,
    /// 订单级错误明细
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
    /// 整组失败时的错误
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 一次调度的汇总报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchReport {
    /// 所有承运商组都没有整组失败
    pub success: bool,
    pub job_id: String,
    pub orders_processed: usize,
    pub shipments_created: usize,
    pub carrier_breakdown: HashMap<String, CarrierBreakdown>,
}

pub struct ShipmentDispatcher {
    marketplace: Arc<dyn MarketplaceAdapter>,
    carriers: Arc<CarrierRegistry>,
    selector: Arc<CarrierSelector>,
    store: Arc<OrderStore>,
    guard: Arc<IdempotencyGuard>,
    fetch_status: String,
    page_size: usize,
    max_pages: usize,
}

impl ShipmentDispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        marketplace: Arc<dyn MarketplaceAdapter>,
        carriers: Arc<CarrierRegistry>,
        selector: Arc<CarrierSelector>,
        store: Arc<OrderStore>,
        guard: Arc<IdempotencyGuard>,
        fetch_status: String,
        page_size: usize,
        max_pages: usize,
    ) -> Self {
        Self {
            marketplace,
            carriers,
            selector,
            store,
            guard,
            fetch_status,
            page_size: page_size.max(1),
            max_pages: max_pages.max(1),
        }
    }

    /// 分页拉取待处理订单并登记
    ///
    /// 翻页直到取齐 total、遇到空页或达到页数上限
    pub async fn fetch_pending(&self) -> AppResult<Vec<MarketplaceOrder>> {
        let mut collected = Vec::new();
        let mut offset = 0;

        for page_index in 0..self.max_pages {
            let query = shared::OrderQuery {
                status: self.fetch_status.clone(),
                limit: self.page_size,
                offset,
            };
            let page = self.marketplace.get_orders(&query).await?;
            let fetched = page.orders.len();

            for order in page.orders {
                // 缺字段的订单跳过，不进调度也不登记
                if let Err(e) = validator::Validate::validate(&order) {
                    tracing::warn!(order_id = %order.order_id, error = %e, "order failed validation, skipped");
                    continue;
                }
                self.store.register(&order);
                collected.push(order);
            }

            if fetched == 0 || collected.len() >= page.total {
                break;
            }
            if page_index + 1 == self.max_pages {
                tracing::warn!(
                    collected = collected.len(),
                    total = page.total,
                    "page ceiling reached before exhausting marketplace orders"
                );
            }
            offset += self.page_size;
        }

        tracing::info!(orders = collected.len(), "fetched pending orders");
        Ok(collected)
    }

    /// 执行一次完整调度
    pub async fn dispatch(&self) -> AppResult<DispatchReport> {
        let job_id = uuid::Uuid::new_v4().to_string();
        let orders = self.fetch_pending().await?;

        let mut report = DispatchReport {
            success: true,
            job_id: job_id.clone(),
            orders_processed: orders.len(),
            shipments_created: 0,
            carrier_breakdown: HashMap::new(),
        };

        // 规则引擎分组
        let mut groups: HashMap<String, Vec<MarketplaceOrder>> = HashMap::new();
        for order in orders {
            let rule = self.selector.select(&order);
            tracing::debug!(
                order_id = %order.order_id,
                rule = %rule.name,
                carrier = %rule.carrier_code,
                "carrier selected"
            );
            groups.entry(rule.carrier_code.clone()).or_default().push(order);
        }

        for (carrier_code, group) in groups {
            let breakdown = self.process_group(&job_id, &carrier_code, group).await;
            if breakdown.error.is_some() {
                report.success = false;
            }
            report.shipments_created += breakdown.created;
            report.carrier_breakdown.insert(carrier_code, breakdown);
        }

        tracing::info!(
            job_id = %job_id,
            orders = report.orders_processed,
            created = report.shipments_created,
            success = report.success,
            "dispatch finished"
        );
        Ok(report)
    }

    /// 处理一个承运商组
    async fn process_group(
        &self,
        job_id: &str,
        carrier_code: &str,
        group: Vec<MarketplaceOrder>,
    ) -> CarrierBreakdown {
        let mut breakdown = CarrierBreakdown {
            orders: group.len(),
            ..Default::default()
        };

        let adapter = match self.carriers.require(carrier_code) {
            Ok(adapter) => adapter,
            Err(e) => {
                // 配置错误不可重试，整组转 FAILED
                tracing::error!(job_id, carrier_code, error = %e, "carrier not configured");
                for order in &group {
                    self.mark_failed(&order.order_id, &e.to_string()).await;
                }
                breakdown.error = Some(e.to_string());
                return breakdown;
            }
        };

        // 去重：已创建过的直接复用，占位成功的进入批量创建；
        // 占位覆盖整个外呼过程，并发调度同一指纹只外呼一次
        let mut fresh = Vec::new();
        for order in group {
            match self.guard.claim(&order).await {
                Claim::Cached(cached) => {
                    tracing::info!(
                        order_id = %order.order_id,
                        tracking_number = %cached.tracking_number,
                        "shipment already created, reusing"
                    );
                    self.record_success(&order.order_id, &cached);
                }
                Claim::InFlight => {
                    tracing::info!(
                        order_id = %order.order_id,
                        "creation in flight in another dispatch, skipped"
                    );
                }
                Claim::Reserved => fresh.push(order),
            }
        }

        if fresh.is_empty() {
            return breakdown;
        }

        match adapter.create_shipments_bulk(&fresh).await {
            Ok(bulk) => {
                for shipment in &bulk.shipments {
                    if let Some(order) = fresh.iter().find(|o| o.order_id == shipment.order_id) {
                        self.guard.record(order, shipment).await;
                    }
                    self.record_success(&shipment.order_id, shipment);
                    breakdown.created += 1;
                }
                for failure in &bulk.failed {
                    breakdown.failed += 1;
                    breakdown
                        .errors
                        .push(format!("{}: {}", failure.order_id, failure.error));
                    // 订单级失败保持 PENDING_POST，下次调度重试
                    self.mark_retry(&failure.order_id, &failure.error);
                }
            }
            Err(e) => {
                tracing::error!(job_id, carrier_code, error = %e, "bulk creation failed");
                breakdown.failed = fresh.len();
                breakdown.error = Some(e.to_string());
                for order in &fresh {
                    if e.is_retry_safe() {
                        self.mark_retry(&order.order_id, &e.to_string());
                    } else {
                        self.mark_failed(&order.order_id, &e.to_string()).await;
                    }
                }
            }
        }

        // 没有兑现的占位统一释放，留给下次调度重试
        for order in &fresh {
            self.guard.release(order).await;
        }

        breakdown
    }

    /// 运单创建成功: 记录承运商字段并推进到 POSTED
    fn record_success(&self, order_id: &str, shipment: &shared::ShipmentResult) {
        let patch = OrderPatch {
            carrier_code: Some(shipment.carrier_code.clone()),
            carrier_name: Some(shipment.carrier_name.clone()),
            tracking_number: Some(shipment.tracking_number.clone()),
            expedition_id: Some(shipment.expedition_id.clone()),
            carrier_status: Some(shipment.status.clone()),
            label_ref: shipment.label_ref.clone(),
            internal_state: Some(InternalState::Posted),
            ..Default::default()
        }
        .with_event("SHIPMENT_CREATED");

        if let Err(e) = self.store.apply(order_id, patch) {
            tracing::error!(order_id, error = %e, "failed to record shipment");
        }
    }

    /// 可重试失败: 保持 PENDING_POST，累加重试计数
    fn mark_retry(&self, order_id: &str, error: &str) {
        let patch = OrderPatch {
            error_message: Some(error.to_string()),
            bump_retry: true,
            ..Default::default()
        }
        .with_event("SHIPMENT_CREATE_RETRYABLE");

        if let Err(e) = self.store.apply(order_id, patch) {
            tracing::error!(order_id, error = %e, "failed to record retry");
        }
    }

    /// 不可重试失败: 转 FAILED 终态并通知 marketplace
    async fn mark_failed(&self, order_id: &str, error: &str) {
        let patch = OrderPatch {
            internal_state: Some(InternalState::Failed),
            error_message: Some(error.to_string()),
            ..Default::default()
        }
        .with_event("SHIPMENT_CREATE_FAILED");

        if let Err(e) = self.store.apply(order_id, patch) {
            tracing::error!(order_id, error = %e, "failed to record failure");
        }

        // 通知失败只记日志，不影响本地终态
        if let Err(e) = self
            .marketplace
            .update_order_status(order_id, "INCIDENT", Some(error))
            .await
        {
            tracing::warn!(order_id, error = %e, "could not report order failure to marketplace");
        }
    }
}
