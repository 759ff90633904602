//! Canonical order lifecycle record
//!
//! [`OrderRecord`] is the orchestrator-owned view of a marketplace order as
//! it moves through shipment creation and tracking reconciliation. The
//! lifecycle is forward-only; see [`InternalState`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::marketplace::{MarketplaceOrder, ShippingAddress};
use crate::util::now_millis;

/// Orchestration-owned lifecycle stage of an order
///
/// Forward-only ordering:
///
/// ```text
/// PENDING_POST -> POSTED -> AWAITING_TRACKING -> CONFIRMED -> DELIVERED
///                    \______________ FAILED (from any non-terminal) ______/
/// ```
///
/// `FAILED` and `DELIVERED` are terminal. A transition that would move a
/// record backward in this ordering is rejected by the state store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InternalState {
    /// Fetched from the marketplace, shipment not yet created
    PendingPost,
    /// Shipment created at the carrier
    Posted,
    /// Tracking pushed to the marketplace, awaiting carrier movement
    AwaitingTracking,
    /// Carrier confirmed the shipment is moving
    Confirmed,
    /// Carrier reported delivery
    Delivered,
    /// Unrecoverable error, terminal
    Failed,
}

impl InternalState {
    /// Position in the forward ordering (FAILED sits outside it)
    pub fn rank(&self) -> u8 {
        match self {
            Self::PendingPost => 0,
            Self::Posted => 1,
            Self::AwaitingTracking => 2,
            Self::Confirmed => 3,
            Self::Delivered => 4,
            Self::Failed => 5,
        }
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal forward transition
    ///
    /// Same-state writes are allowed (idempotent refresh). `FAILED` is
    /// reachable from any non-terminal state.
    pub fn can_transition_to(&self, next: InternalState) -> bool {
        if *self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        if next == Self::Failed {
            return true;
        }
        next.rank() > self.rank()
    }

    /// Wire name, e.g. `"PENDING_POST"`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingPost => "PENDING_POST",
            Self::Posted => "POSTED",
            Self::AwaitingTracking => "AWAITING_TRACKING",
            Self::Confirmed => "CONFIRMED",
            Self::Delivered => "DELIVERED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for InternalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One record per marketplace order, retained for audit (never deleted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Marketplace order id (unique, immutable)
    pub order_id: String,

    // === Marketplace fields ===
    pub buyer_name: String,
    pub buyer_email: Option<String>,
    pub total_amount: Decimal,
    pub currency: String,
    pub shipping_address: ShippingAddress,
    /// Status as reported by the marketplace
    pub marketplace_status: String,

    // === Carrier fields (absent until POSTED) ===
    pub carrier_code: Option<String>,
    pub carrier_name: Option<String>,
    pub tracking_number: Option<String>,
    /// Carrier expedition / shipment reference
    pub expedition_id: Option<String>,
    /// Last status reported by the carrier, in the carrier's vocabulary
    pub carrier_status: Option<String>,
    pub label_ref: Option<String>,

    // === Orchestration fields ===
    pub internal_state: InternalState,
    pub last_event: Option<String>,
    pub last_event_at: Option<i64>,
    pub error_message: Option<String>,
    pub retry_count: u32,

    // === Timestamps (Unix millis) ===
    /// Set once at creation, never overwritten
    pub created_at: i64,
    /// Refreshed on every mutation
    pub updated_at: i64,
}

impl OrderRecord {
    /// Build a fresh `PENDING_POST` record from a marketplace order
    pub fn from_marketplace(order: &MarketplaceOrder) -> Self {
        let now = now_millis();
        Self {
            order_id: order.order_id.clone(),
            buyer_name: order.buyer.name.clone(),
            buyer_email: order.buyer.email.clone(),
            total_amount: order.totals.goods + order.totals.shipping,
            currency: order.currency.clone(),
            shipping_address: order.shipping.clone(),
            marketplace_status: order.status.clone(),
            carrier_code: None,
            carrier_name: None,
            tracking_number: None,
            expedition_id: None,
            carrier_status: None,
            label_ref: None,
            internal_state: InternalState::PendingPost,
            last_event: None,
            last_event_at: None,
            error_message: None,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

}

/// Partial update merged into an [`OrderRecord`] by the state store
///
/// `None` fields are left untouched. `internal_state` is subject to the
/// forward-only transition check.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub marketplace_status: Option<String>,
    pub carrier_code: Option<String>,
    pub carrier_name: Option<String>,
    pub tracking_number: Option<String>,
    pub expedition_id: Option<String>,
    pub carrier_status: Option<String>,
    pub label_ref: Option<String>,
    pub internal_state: Option<InternalState>,
    pub last_event: Option<String>,
    pub last_event_at: Option<i64>,
    pub error_message: Option<String>,
    /// Increment `retry_count` by one
    pub bump_retry: bool,
}

impl OrderPatch {
    /// Patch that only advances the lifecycle state
    pub fn state(state: InternalState) -> Self {
        Self {
            internal_state: Some(state),
            ..Default::default()
        }
    }

    /// Attach a last-event marker with the current timestamp
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.last_event = Some(event.into());
        self.last_event_at = Some(now_millis());
        self
    }
}

/// Filter for state-store queries
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub carrier_code: Option<String>,
    pub internal_state: Option<InternalState>,
    /// Skip DELIVERED and FAILED records
    pub exclude_terminal: bool,
    /// Only records that already have a tracking number
    pub has_tracking: bool,
}

impl OrderFilter {
    /// Whether `record` passes this filter
    pub fn matches(&self, record: &OrderRecord) -> bool {
        if let Some(code) = &self.carrier_code
            && record.carrier_code.as_deref() != Some(code.as_str())
        {
            return false;
        }
        if let Some(state) = self.internal_state
            && record.internal_state != state
        {
            return false;
        }
        if self.exclude_terminal && record.internal_state.is_terminal() {
            return false;
        }
        if self.has_tracking && record.tracking_number.is_none() {
            return false;
        }
        true
    }
}
