//! Inbound marketplace order payloads
//!
//! [`MarketplaceOrder`] is the normalized shape every marketplace adapter
//! produces; the rule engine and the dispatcher only ever see this form.
//! Validation mirrors what the marketplace contract requires on a
//! create/update request.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Buyer information
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Buyer {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Shipping destination
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ShippingAddress {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub address1: String,
    pub address2: Option<String>,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub postcode: String,
    /// ISO 3166-1 alpha-2, uppercase
    #[validate(length(equal = 2))]
    pub country: String,
}

/// One order line
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderItem {
    #[validate(length(min = 1))]
    pub sku: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 1))]
    pub qty: u32,
    pub unit_price: Decimal,
}

/// Order amounts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderTotals {
    pub goods: Decimal,
    #[serde(default)]
    pub shipping: Decimal,
}

/// Normalized marketplace order
///
/// `weight`, `cod_amount` and `service_type` are the attributes the carrier
/// selection rules evaluate; a missing attribute makes the corresponding
/// rule evaluate to "does not match" rather than failing selection.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MarketplaceOrder {
    #[validate(length(min = 1))]
    pub order_id: String,
    /// Order creation time at the marketplace (Unix millis)
    pub created_at: i64,
    /// Marketplace status, e.g. `PENDING`, `ACCEPTED`, `SHIPPED`
    #[validate(length(min = 1))]
    pub status: String,
    #[validate(nested)]
    pub buyer: Buyer,
    #[validate(nested)]
    pub shipping: ShippingAddress,
    #[validate(length(min = 1), nested)]
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Package weight in kg
    #[serde(default)]
    pub weight: f64,
    /// Cash-on-delivery amount, if the order is COD
    pub cod_amount: Option<Decimal>,
    /// Requested service, e.g. `standard`, `express`
    pub service_type: Option<String>,
}

fn default_currency() -> String {
    "EUR".to_string()
}

/// Query parameters for the canonical marketplace fetch contract
///
/// Offset/limit pagination with an explicit status filter; callers enforce
/// a hard page ceiling on top of this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderQuery {
    pub status: String,
    pub limit: usize,
    pub offset: usize,
}

impl OrderQuery {
    pub fn pending(limit: usize) -> Self {
        Self {
            status: "PENDING".to_string(),
            limit,
            offset: 0,
        }
    }
}

/// One page of marketplace orders
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderPage {
    pub orders: Vec<MarketplaceOrder>,
    /// Total matching orders at the marketplace, across all pages
    pub total: usize,
}
