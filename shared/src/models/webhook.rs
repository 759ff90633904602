//! Inbound carrier webhook events

use serde::{Deserialize, Serialize};

use crate::util::short_sha256;

/// A carrier-pushed tracking event
///
/// Transient: parsed from the webhook body, reconciled, and dropped. Only
/// the derived identity is retained (for replay detection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Caller-supplied event id; when absent the identity is derived from
    /// the canonical payload
    pub event_id: Option<String>,
    pub event_type: String,
    /// Carrier-side shipment reference
    pub expedition_id: Option<String>,
    pub tracking_number: Option<String>,
    pub status: String,
    /// ISO-8601 event time as sent by the carrier
    pub timestamp: Option<String>,
}

impl WebhookEvent {
    /// Stable identity for replay detection
    ///
    /// Prefers the caller-supplied `event_id`; otherwise derives one by
    /// hashing the canonical serialized event, so a byte-identical second
    /// delivery always maps to the same identity.
    pub fn identity(&self) -> String {
        if let Some(id) = &self.event_id
            && !id.is_empty()
        {
            return id.clone();
        }
        let canonical = serde_json::to_string(self).unwrap_or_default();
        short_sha256(&canonical)
    }

    /// The reference used to resolve the order: tracking number first,
    /// expedition id as fallback
    pub fn reference(&self) -> Option<&str> {
        self.tracking_number
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.expedition_id.as_deref())
    }
}
