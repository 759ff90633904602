//! Mirakl marketplace 适配器
//!
//! HTTP 模式走 Mirakl 风格的订单接口（`Authorization` 直接携带 API key），
//! mock 模式返回内置的确定性订单集，便于本地联调与测试。

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    AppError, AppResult, Buyer, MarketplaceOrder, OrderItem, OrderPage, OrderQuery, OrderTotals,
    ShippingAddress,
};

use crate::adapters::map_marketplace_err;
use crate::adapters::marketplace::MarketplaceAdapter;

pub struct MiraklAdapter {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    mock_mode: bool,
    /// mock 模式下的内置订单集
    seeded: Vec<MarketplaceOrder>,
}

/// Mirakl 订单列表响应
#[derive(Debug, Deserialize)]
struct OrdersResponse {
    orders: Vec<MarketplaceOrder>,
    total_count: usize,
}

impl MiraklAdapter {
    pub fn new(base_url: String, api_key: String, client: reqwest::Client, mock_mode: bool) -> Self {
        Self {
            base_url,
            api_key,
            client,
            mock_mode,
            seeded: if mock_mode { seed_orders() } else { Vec::new() },
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl MarketplaceAdapter for MiraklAdapter {
    async fn get_orders(&self, query: &OrderQuery) -> AppResult<OrderPage> {
        if self.mock_mode {
            let matching: Vec<&MarketplaceOrder> = self
                .seeded
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
            return Ok(OrderPage { orders, total });
        }

        let response = self
            .client
            .get(self.url("/api/orders"))
            .header("Authorization", &self.api_key)
            .query(&[
                ("order_state", query.status.as_str()),
                ("max", &query.limit.to_string()),
                ("offset", &query.offset.to_string()),
            ])
            .send()
            .await
            .map_err(map_marketplace_err)?;

        if !response.status().is_success() {
            return Err(AppError::marketplace(format!(
                "order listing returned {}",
                response.status()
            )));
        }

        let body: OrdersResponse = response.json().await.map_err(map_marketplace_err)?;
        Ok(OrderPage {
            orders: body.orders,
            total: body.total_count,
        })
    }

    async fn get_order_details(&self, order_id: &str) -> AppResult<MarketplaceOrder> {
        if self.mock_mode {
            return self
                .seeded
                .iter()
                .find(|o| o.order_id == order_id)
                .cloned()
                .ok_or_else(|| AppError::order_not_found(order_id));
        }

        let response = self
            .client
            .get(self.url(&format!("/api/orders/{order_id}")))
            .header("Authorization", &self.api_key)
            .send()
            .await
            .map_err(map_marketplace_err)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::order_not_found(order_id));
        }
        if !response.status().is_success() {
            return Err(AppError::marketplace(format!(
                "order lookup returned {}",
                response.status()
            )));
        }

        response.json().await.map_err(map_marketplace_err)
    }

    async fn update_order_tracking(
        &self,
        order_id: &str,
        carrier_code: &str,
        carrier_name: &str,
        tracking_number: &str,
    ) -> AppResult<()> {
        if self.mock_mode {
            tracing::info!(
                order_id,
                carrier_code,
                tracking_number,
                "mock: tracking uploaded"
            );
            return Ok(());
        }

        let body = serde_json::json!({
            "carrier_code": carrier_code,
            "carrier_name": carrier_name,
            "tracking_number": tracking_number,
        });

        let response = self
            .client
            .put(self.url(&format!("/api/orders/{order_id}/tracking")))
            .header("Authorization", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_marketplace_err)?;

        if !response.status().is_success() {
            return Err(AppError::marketplace(format!(
                "tracking upload returned {}",
                response.status()
            ))
            .with_detail("order_id", order_id.to_string()));
        }
        Ok(())
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        status: &str,
        reason: Option<&str>,
    ) -> AppResult<()> {
        if self.mock_mode {
            tracing::info!(order_id, status, "mock: order status updated");
            return Ok(());
        }

        let response = self
            .client
            .put(self.url(&format!("/api/orders/{order_id}/status")))
            .header("Authorization", &self.api_key)
            .json(&serde_json::json!({ "status": status, "reason": reason }))
            .send()
            .await
            .map_err(map_marketplace_err)?;

        if !response.status().is_success() {
            return Err(AppError::marketplace(format!(
                "status update returned {}",
                response.status()
            ))
            .with_detail("order_id", order_id.to_string()));
        }
        Ok(())
    }

    async fn update_order_ship(&self, order_id: &str) -> AppResult<()> {
        if self.mock_mode {
            tracing::info!(order_id, "mock: order marked shipped");
            return Ok(());
        }

        let response = self
            .client
            .put(self.url(&format!("/api/orders/{order_id}/ship")))
            .header("Authorization", &self.api_key)
            .send()
            .await
            .map_err(map_marketplace_err)?;

        if !response.status().is_success() {
            return Err(AppError::marketplace(format!(
                "ship confirmation returned {}",
                response.status()
            ))
            .with_detail("order_id", order_id.to_string()));
        }
        Ok(())
    }
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap_or_default()
}

/// mock 模式的内置订单
///
/// 覆盖三条默认规则：普通国内件、超重件、国际件。
fn seed_orders() -> Vec<MarketplaceOrder> {
    vec![
        MarketplaceOrder {
            order_id: "MIR-1001".to_string(),
            created_at: 1_756_000_000_000,
            status: "PENDING".to_string(),
            buyer: Buyer {
                name: "Ana García".to_string(),
                email: Some("ana@example.com".to_string()),
                phone: Some("+34600000001".to_string()),
            },
            shipping: ShippingAddress {
                name: "Ana García".to_string(),
                address1: "Calle Mayor 1".to_string(),
                address2: None,
                city: "Madrid".to_string(),
                postcode: "28001".to_string(),
                country: "ES".to_string(),
            },
            items: vec![OrderItem {
                sku: "SKU-100".to_string(),
                name: "Ceramic mug".to_string(),
                qty: 2,
                unit_price: dec("9.99"),
            }],
            totals: OrderTotals {
                goods: dec("19.98"),
                shipping: dec("4.50"),
            },
            currency: "EUR".to_string(),
            weight: 2.0,
            cod_amount: None,
            service_type: Some("standard".to_string()),
        },
        MarketplaceOrder {
            order_id: "MIR-1002".to_string(),
            created_at: 1_756_000_060_000,
            status: "PENDING".to_string(),
            buyer: Buyer {
                name: "Bruno Díaz".to_string(),
                email: Some("bruno@example.com".to_string()),
                phone: None,
            },
            shipping: ShippingAddress {
                name: "Bruno Díaz".to_string(),
                address1: "Av. del Puerto 22".to_string(),
                address2: Some("Nave 3".to_string()),
                city: "Valencia".to_string(),
                postcode: "46021".to_string(),
                country: "ES".to_string(),
            },
            items: vec![OrderItem {
                sku: "SKU-200".to_string(),
                name: "Cast iron stove".to_string(),
                qty: 1,
                unit_price: dec("349.00"),
            }],
            totals: OrderTotals {
                goods: dec("349.00"),
                shipping: dec("29.00"),
            },
            currency: "EUR".to_string(),
            weight: 25.0,
            cod_amount: None,
            service_type: Some("standard".to_string()),
        },
        MarketplaceOrder {
            order_id: "MIR-1003".to_string(),
            created_at: 1_756_000_120_000,
            status: "PENDING".to_string(),
            buyer: Buyer {
                name: "Claire Dupont".to_string(),
                email: Some("claire@example.fr".to_string()),
                phone: None,
            },
            shipping: ShippingAddress {
                name: "Claire Dupont".to_string(),
                address1: "12 Rue de la Paix".to_string(),
                address2: None,
                city: "Paris".to_string(),
                postcode: "75002".to_string(),
                country: "FR".to_string(),
            },
            items: vec![OrderItem {
                sku: "SKU-300".to_string(),
                name: "Leather wallet".to_string(),
                qty: 1,
                unit_price: dec("59.00"),
            }],
            totals: OrderTotals {
                goods: dec("59.00"),
                shipping: dec("9.90"),
            },
            currency: "EUR".to_string(),
            weight: 0.4,
            cod_amount: None,
            service_type: Some("standard".to_string()),
        },
    ]
}
