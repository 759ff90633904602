//! 运单调度 - 拉单、选择承运商、创建运单
//!
//! # 模块结构
//!
//! - [`idempotency`] - 创建去重防护
//! - [`dispatcher`] - 调度主流程

pub mod dispatcher;
pub mod idempotency;

pub use dispatcher::{CarrierBreakdown, DispatchReport, ShipmentDispatcher};
pub use idempotency::{Claim, IdempotencyGuard};
