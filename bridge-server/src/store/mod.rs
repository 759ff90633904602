//! 订单状态存储

pub mod order_store;

pub use order_store::OrderStore;
