//! Domain models
//!
//! - [`order`] — canonical order lifecycle record and state machine
//! - [`marketplace`] — inbound marketplace order payloads
//! - [`shipment`] — carrier collaborator result types
//! - [`webhook`] — inbound carrier webhook events

pub mod marketplace;
pub mod order;
pub mod shipment;
pub mod webhook;

pub use marketplace::{Buyer, MarketplaceOrder, OrderItem, OrderPage, OrderQuery, OrderTotals, ShippingAddress};
pub use order::{InternalState, OrderFilter, OrderPatch, OrderRecord};
pub use shipment::{BulkCreateResult, CancelResult, FailedShipment, ShipmentResult, StatusResult, TrackingEvent};
pub use webhook::WebhookEvent;
