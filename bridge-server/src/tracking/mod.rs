//! Tracking 对账 - webhook 接入与主动轮询
//!
//! # 模块结构
//!
//! - [`webhook`] - webhook 签名与时间戳校验、事件去重
//! - [`reconciler`] - 承运商状态到生命周期状态的对账
//! - [`poller`] - 后台轮询循环

pub mod poller;
pub mod reconciler;
pub mod webhook;

pub use poller::TrackingPoller;
pub use reconciler::{ConfirmSummary, PollSummary, TrackingReconciler, WebhookOutcome};
pub use webhook::WebhookAuthenticator;
