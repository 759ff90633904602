//! 通用 HTTP 承运商适配器
//!
//! 各承运商的 REST 接口大同小异，差异收敛在 [`CarrierConfig`] 里：
//! 基础地址、认证方式（Basic / OAuth2）和 mock 开关。
//! mock 模式下不发任何网络请求，返回由订单号派生的确定性数据。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use shared::{
    AppError, AppResult, CancelResult, MarketplaceOrder, ShipmentResult, StatusResult,
    TrackingEvent, util::{now_millis, short_sha256},
};

use crate::adapters::carrier::CarrierAdapter;
use crate::adapters::map_carrier_err;
use crate::adapters::oauth::{HttpTokenExchanger, OAuthTokenCache};
use crate::core::{CarrierAuth, CarrierConfig};

pub struct HttpCarrierAdapter {
    config: CarrierConfig,
    client: reqwest::Client,
    /// OAuth2 承运商才持有 token 缓存
    oauth: Option<Arc<OAuthTokenCache>>,
}

impl HttpCarrierAdapter {
    pub fn new(config: CarrierConfig, client: reqwest::Client) -> Self {
        let oauth = match &config.auth {
            CarrierAuth::OAuth2 {
                token_url,
                client_id,
                client_secret,
            } => Some(Arc::new(OAuthTokenCache::new(Arc::new(
                HttpTokenExchanger::new(
                    client.clone(),
                    token_url.clone(),
                    client_id.clone(),
                    client_secret.clone(),
                ),
            )))),
            CarrierAuth::Basic { .. } => None,
        };

        Self {
            config,
            client,
            oauth,
        }
    }

    /// 给请求附加认证信息
    async fn authed(&self, request: reqwest::RequestBuilder) -> AppResult<reqwest::RequestBuilder> {
        match &self.config.auth {
            CarrierAuth::Basic { username, password } => {
                Ok(request.basic_auth(username, Some(password)))
            }
            CarrierAuth::OAuth2 { .. } => {
                // new() 里 OAuth2 一定初始化了缓存
                let cache = self
                    .oauth
                    .as_ref()
                    .ok_or_else(|| AppError::config("oauth cache missing"))?;
                let token = cache.token().await?;
                Ok(request.bearer_auth(token))
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    // ==================== Mock 实现 ====================

    /// 由订单号派生确定性的运单数据
    fn mock_shipment(&self, order: &MarketplaceOrder) -> ShipmentResult {
        let digest = short_sha256(&order.order_id).to_uppercase();
        let code_upper = self.config.code.to_uppercase();
        // 按字符截前缀，承运商代码可能含多字节字符
        let prefix: String = code_upper.chars().take(3).collect();
        let expedition_id = format!("{}-EXP-{}", code_upper, &digest[..10]);
        ShipmentResult {
            order_id: order.order_id.clone(),
            tracking_number: format!("{}{}", prefix, &digest[..10]),
            carrier_code: self.config.code.clone(),
            carrier_name: self.config.name.clone(),
            status: "CREATED".to_string(),
            label_ref: Some(format!("labels/{expedition_id}.pdf")),
            expedition_id,
        }
    }

    fn mock_status(&self, tracking_number: &str) -> StatusResult {
        StatusResult {
            tracking_number: tracking_number.to_string(),
            status: "IN_TRANSIT".to_string(),
            events: vec![TrackingEvent {
                timestamp: now_millis(),
                status: "IN_TRANSIT".to_string(),
                description: Some("Departed origin facility".to_string()),
                location: Some("Madrid".to_string()),
            }],
            delivered_at: None,
        }
    }
}

#[async_trait]
impl CarrierAdapter for HttpCarrierAdapter {
    fn carrier_code(&self) -> &str {
        &self.config.code
    }

    fn carrier_name(&self) -> &str {
        &self.config.name
    }

    fn is_mock_mode(&self) -> bool {
        self.config.mock_mode
    }

    async fn create_shipment(&self, order: &MarketplaceOrder) -> AppResult<ShipmentResult> {
        if self.config.mock_mode {
            return Ok(self.mock_shipment(order));
        }

        let body = json!({
            "reference": order.order_id,
            "recipient": {
                "name": order.shipping.name,
                "address1": order.shipping.address1,
                "address2": order.shipping.address2,
                "city": order.shipping.city,
                "postcode": order.shipping.postcode,
                "country": order.shipping.country,
            },
            "weight_kg": order.weight,
            "cod_amount": order.cod_amount,
            "service_type": order.service_type,
        });

        let request = self.client.post(self.url("/shipments")).json(&body);
        let response = self
            .authed(request)
            .await?
            .send()
            .await
            .map_err(|e| map_carrier_err(&self.config.code, e))?;

        if !response.status().is_success() {
            return Err(AppError::carrier(format!(
                "{}: shipment creation returned {}",
                self.config.code,
                response.status()
            ))
            .with_detail("order_id", order.order_id.clone()));
        }

        response
            .json::<ShipmentResult>()
            .await
            .map_err(|e| map_carrier_err(&self.config.code, e))
    }

    async fn get_shipment_status(&self, tracking_number: &str) -> AppResult<StatusResult> {
        if self.config.mock_mode {
            return Ok(self.mock_status(tracking_number));
        }

        let request = self
            .client
            .get(self.url(&format!("/tracking/{tracking_number}")));
        let response = self
            .authed(request)
            .await?
            .send()
            .await
            .map_err(|e| map_carrier_err(&self.config.code, e))?;

        if !response.status().is_success() {
            return Err(AppError::carrier(format!(
                "{}: status query returned {}",
                self.config.code,
                response.status()
            ))
            .with_detail("tracking_number", tracking_number.to_string()));
        }

        response
            .json::<StatusResult>()
            .await
            .map_err(|e| map_carrier_err(&self.config.code, e))
    }

    async fn get_shipment_label(&self, expedition_id: &str) -> AppResult<Vec<u8>> {
        if self.config.mock_mode {
            return Ok(format!("%PDF-1.4 mock label {expedition_id}").into_bytes());
        }

        let request = self
            .client
            .get(self.url(&format!("/shipments/{expedition_id}/label")));
        let response = self
            .authed(request)
            .await?
            .send()
            .await
            .map_err(|e| map_carrier_err(&self.config.code, e))?;

        if !response.status().is_success() {
            return Err(AppError::carrier(format!(
                "{}: label download returned {}",
                self.config.code,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_carrier_err(&self.config.code, e))?;
        Ok(bytes.to_vec())
    }

    async fn cancel_shipment(&self, expedition_id: &str) -> AppResult<CancelResult> {
        if self.config.mock_mode {
            return Ok(CancelResult {
                expedition_id: expedition_id.to_string(),
                cancelled: true,
                reason: None,
            });
        }

        let request = self
            .client
            .post(self.url(&format!("/shipments/{expedition_id}/cancel")));
        let response = self
            .authed(request)
            .await?
            .send()
            .await
            .map_err(|e| map_carrier_err(&self.config.code, e))?;

        if !response.status().is_success() {
            return Err(AppError::carrier(format!(
                "{}: cancellation returned {}",
                self.config.code,
                response.status()
            )));
        }

        response
            .json::<CancelResult>()
            .await
            .map_err(|e| map_carrier_err(&self.config.code, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::{Buyer, OrderItem, OrderTotals, ShippingAddress};

    fn mock_config(code: &str) -> CarrierConfig {
        CarrierConfig {
            code: code.to_string(),
            name: code.to_uppercase(),
            base_url: "http://unused.invalid".to_string(),
            auth: CarrierAuth::Basic {
                username: "u".to_string(),
                password: "p".to_string(),
            },
            mock_mode: true,
        }
    }

    fn order(order_id: &str) -> MarketplaceOrder {
        MarketplaceOrder {
            order_id: order_id.to_string(),
            created_at: 1_700_000_000_000,
            status: "PENDING".to_string(),
            buyer: Buyer {
                name: "Test Buyer".to_string(),
                email: None,
                phone: None,
            },
            shipping: ShippingAddress {
                name: "Test Buyer".to_string(),
                address1: "Calle Uno 1".to_string(),
                address2: None,
                city: "Madrid".to_string(),
                postcode: "28001".to_string(),
                country: "ES".to_string(),
            },
            items: vec![OrderItem {
                sku: "SKU-1".to_string(),
                name: "Widget".to_string(),
                qty: 1,
                unit_price: Decimal::ONE,
            }],
            totals: OrderTotals::default(),
            currency: "EUR".to_string(),
            weight: 1.0,
            cod_amount: None,
            service_type: None,
        }
    }

    #[tokio::test]
    async fn test_mock_shipment_is_deterministic() {
        let adapter = HttpCarrierAdapter::new(mock_config("tipsa"), reqwest::Client::new());

        let a = adapter.create_shipment(&order("MIR-001")).await.unwrap();
        let b = adapter.create_shipment(&order("MIR-001")).await.unwrap();
        assert_eq!(a.tracking_number, b.tracking_number);
        assert_eq!(a.expedition_id, b.expedition_id);
        assert_eq!(a.carrier_code, "tipsa");
        assert_eq!(a.status, "CREATED");

        let c = adapter.create_shipment(&order("MIR-002")).await.unwrap();
        assert_ne!(a.tracking_number, c.tracking_number);
    }

    #[tokio::test]
    async fn test_mock_shipment_with_multibyte_carrier_code() {
        let adapter = HttpCarrierAdapter::new(mock_config("ñandú"), reqwest::Client::new());

        let result = adapter.create_shipment(&order("MIR-001")).await.unwrap();
        assert!(result.tracking_number.starts_with("ÑAN"));
        assert_eq!(result.carrier_code, "ñandú");
    }

    #[tokio::test]
    async fn test_mock_bulk_preserves_order() {
        let adapter = HttpCarrierAdapter::new(mock_config("dhl"), reqwest::Client::new());
        let orders = vec![order("MIR-001"), order("MIR-002"), order("MIR-003")];

        let result = adapter.create_shipments_bulk(&orders).await.unwrap();
        assert_eq!(result.total_created, 3);
        assert_eq!(result.total_failed, 0);
        let ids: Vec<_> = result.shipments.iter().map(|s| s.order_id.as_str()).collect();
        assert_eq!(ids, vec!["MIR-001", "MIR-002", "MIR-003"]);
    }
}
