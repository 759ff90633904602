//! Shared types for the Shipbridge orchestrator
//!
//! Common types used by the server crate and integration tests: the unified
//! error system, domain models (orders, shipments, webhook events), and
//! small utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use models::{
    BulkCreateResult, Buyer, CancelResult, FailedShipment, InternalState, MarketplaceOrder,
    OrderFilter, OrderItem, OrderPage, OrderPatch, OrderQuery, OrderRecord, OrderTotals,
    ShipmentResult, ShippingAddress, StatusResult, TrackingEvent, WebhookEvent,
};
