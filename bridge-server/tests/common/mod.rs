//! 集成测试公共部分 - 假适配器与状态组装
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use bridge_server::adapters::{CarrierAdapter, CarrierRegistry, MarketplaceAdapter};
use bridge_server::core::{Config, ServerState};
use bridge_server::rules::CarrierSelector;
use rust_decimal::Decimal;
use shared::{
    AppError, AppResult, Buyer, CancelResult, MarketplaceOrder, OrderItem, OrderPage, OrderQuery,
    OrderTotals, ShipmentResult, ShippingAddress, StatusResult,
};
use tokio::sync::Mutex;

/// 可控的假承运商
pub struct FakeCarrier {
    code: String,
    name: String,
    pub create_calls: AtomicU32,
    pub status_calls: AtomicU32,
    /// 批量创建时返回这个错误
    pub fail_bulk_with: Mutex<Option<AppError>>,
    /// 批量创建前先睡这么久，用来制造并发窗口
    pub create_delay: Mutex<Option<std::time::Duration>>,
    /// 状态查询统一返回这个状态
    pub report_status: Mutex<String>,
}

impl FakeCarrier {
    pub fn new(code: &str) -> Arc<Self> {
        Arc::new(Self {
            code: code.to_string(),
            name: code.to_uppercase(),
            create_calls: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
            fail_bulk_with: Mutex::new(None),
            create_delay: Mutex::new(None),
            report_status: Mutex::new("CREATED".to_string()),
        })
    }

    pub async fn fail_with(&self, error: AppError) {
        *self.fail_bulk_with.lock().await = Some(error);
    }

    pub async fn delay_creates(&self, delay: std::time::Duration) {
        *self.create_delay.lock().await = Some(delay);
    }

    pub async fn report(&self, status: &str) {
        *self.report_status.lock().await = status.to_string();
    }
}

#[async_trait]
impl CarrierAdapter for FakeCarrier {
    fn carrier_code(&self) -> &str {
        &self.code
    }

    fn carrier_name(&self) -> &str {
        &self.name
    }

    fn is_mock_mode(&self) -> bool {
        true
    }

    async fn create_shipments_bulk(
        &self,
        orders: &[MarketplaceOrder],
    ) -> AppResult<shared::BulkCreateResult> {
        if let Some(delay) = *self.create_delay.lock().await {
            tokio::time::sleep(delay).await;
        }
        // 整组失败的注入点
        if let Some(error) = self.fail_bulk_with.lock().await.clone() {
            return Err(error);
        }
        let mut result = shared::BulkCreateResult::default();
        for order in orders {
            result.shipments.push(self.create_shipment(order).await?);
            result.total_created += 1;
        }
        Ok(result)
    }

    async fn create_shipment(&self, order: &MarketplaceOrder) -> AppResult<ShipmentResult> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ShipmentResult {
            order_id: order.order_id.clone(),
            expedition_id: format!("{}-EXP-{}", self.name, order.order_id),
            tracking_number: format!("{}-TRK-{}", self.name, order.order_id),
            carrier_code: self.code.clone(),
            carrier_name: self.name.clone(),
            status: "CREATED".to_string(),
            label_ref: None,
        })
    }

    async fn get_shipment_status(&self, tracking_number: &str) -> AppResult<StatusResult> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(StatusResult {
            tracking_number: tracking_number.to_string(),
            status: self.report_status.lock().await.clone(),
            events: Vec::new(),
            delivered_at: None,
        })
    }

    async fn get_shipment_label(&self, expedition_id: &str) -> AppResult<Vec<u8>> {
        Ok(format!("%PDF-1.4 fake {expedition_id}").into_bytes())
    }

    async fn cancel_shipment(&self, expedition_id: &str) -> AppResult<CancelResult> {
        Ok(CancelResult {
            expedition_id: expedition_id.to_string(),
            cancelled: true,
            reason: None,
        })
    }
}

/// 记录回写的假 marketplace
pub struct FakeMarketplace {
    orders: Vec<MarketplaceOrder>,
    pub tracking_pushes: Mutex<Vec<(String, String)>>,
    pub status_updates: Mutex<Vec<(String, String)>>,
    pub shipped: Mutex<Vec<String>>,
}

impl FakeMarketplace {
    pub fn with_orders(orders: Vec<MarketplaceOrder>) -> Arc<Self> {
        Arc::new(Self {
            orders,
            tracking_pushes: Mutex::new(Vec::new()),
            status_updates: Mutex::new(Vec::new()),
            shipped: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl MarketplaceAdapter for FakeMarketplace {
    async fn get_orders(&self, query: &OrderQuery) -> AppResult<OrderPage> {
        let matching: Vec<&MarketplaceOrder> = self
            .orders
            .iter()
            .filter(|o| o.status == query.status)
            .collect();
        let total = matching.len();
        let orders = matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect();
        Ok(OrderPage { orders, total })
    }

    async fn get_order_details(&self, order_id: &str) -> AppResult<MarketplaceOrder> {
        self.orders
            .iter()
            .find(|o| o.order_id == order_id)
            .cloned()
            .ok_or_else(|| AppError::order_not_found(order_id))
    }

    async fn update_order_tracking(
        &self,
        order_id: &str,
        _carrier_code: &str,
        _carrier_name: &str,
        tracking_number: &str,
    ) -> AppResult<()> {
        self.tracking_pushes
            .lock()
            .await
            .push((order_id.to_string(), tracking_number.to_string()));
        Ok(())
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        status: &str,
        _reason: Option<&str>,
    ) -> AppResult<()> {
        self.status_updates
            .lock()
            .await
            .push((order_id.to_string(), status.to_string()));
        Ok(())
    }

    async fn update_order_ship(&self, order_id: &str) -> AppResult<()> {
        self.shipped.lock().await.push(order_id.to_string());
        Ok(())
    }
}

/// 构造测试订单
pub fn make_order(order_id: &str, weight: f64, country: &str) -> MarketplaceOrder {
    MarketplaceOrder {
        order_id: order_id.to_string(),
        created_at: 1_756_000_000_000,
        status: "PENDING".to_string(),
        buyer: Buyer {
            name: "Test Buyer".to_string(),
            email: Some("buyer@example.com".to_string()),
            phone: None,
        },
        shipping: ShippingAddress {
            name: "Test Buyer".to_string(),
            address1: "Calle Uno 1".to_string(),
            address2: None,
            city: "Madrid".to_string(),
            postcode: "28001".to_string(),
            country: country.to_string(),
        },
        items: vec![OrderItem {
            sku: "SKU-1".to_string(),
            name: "Widget".to_string(),
            qty: 1,
            unit_price: Decimal::ONE,
        }],
        totals: OrderTotals {
            goods: Decimal::ONE,
            shipping: Decimal::ZERO,
        },
        currency: "EUR".to_string(),
        weight,
        cod_amount: None,
        service_type: Some("standard".to_string()),
    }
}

/// 组装一个接好假适配器的服务器状态
pub fn build_state(
    marketplace: Arc<FakeMarketplace>,
    carriers: Vec<Arc<FakeCarrier>>,
) -> ServerState {
    let mut config = Config::from_env();
    config.webhook_secrets = HashMap::from([
        ("tipsa".to_string(), "test-secret-tipsa".to_string()),
        ("ups".to_string(), "test-secret-ups".to_string()),
        ("dhl".to_string(), "test-secret-dhl".to_string()),
    ]);

    let mut registry = CarrierRegistry::new();
    for carrier in carriers {
        registry.register(carrier);
    }

    ServerState::assemble(
        config,
        marketplace,
        Arc::new(registry),
        Arc::new(CarrierSelector::with_default_rules()),
    )
}
