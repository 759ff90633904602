//! Carrier collaborator result types
//!
//! Every carrier adapter, whatever its wire format, produces these shapes.

use serde::{Deserialize, Serialize};

/// Result of a single shipment creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentResult {
    pub order_id: String,
    /// Carrier-side shipment reference
    pub expedition_id: String,
    pub tracking_number: String,
    pub carrier_code: String,
    pub carrier_name: String,
    /// Carrier-reported status at creation time, normally `CREATED`
    pub status: String,
    /// Reference to the shipping label, when the carrier returns one
    pub label_ref: Option<String>,
}

/// A per-order failure inside a bulk creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedShipment {
    pub order_id: String,
    pub error: String,
}

/// Result of a bulk shipment creation
///
/// `shipments` preserves the input order of the successfully created
/// entries; `failed` lists the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkCreateResult {
    pub shipments: Vec<ShipmentResult>,
    pub total_created: usize,
    pub total_failed: usize,
    pub failed: Vec<FailedShipment>,
}

/// One tracking movement reported by a carrier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
    /// Unix millis
    pub timestamp: i64,
    pub status: String,
    pub description: Option<String>,
    pub location: Option<String>,
}

/// Current shipment status as reported by a carrier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResult {
    pub tracking_number: String,
    /// Carrier vocabulary, e.g. `CREATED`, `IN_TRANSIT`, `DELIVERED`
    pub status: String,
    #[serde(default)]
    pub events: Vec<TrackingEvent>,
    pub delivered_at: Option<i64>,
}

/// Result of a shipment cancellation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResult {
    pub expedition_id: String,
    pub cancelled: bool,
    pub reason: Option<String>,
}
