//! 承运商选择规则引擎

pub mod engine;

pub use engine::{CarrierSelector, Condition, SelectionRule};
