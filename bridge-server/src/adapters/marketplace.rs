//! Marketplace 适配器接口

use async_trait::async_trait;
use shared::{AppResult, MarketplaceOrder, OrderPage, OrderQuery};

/// Marketplace 适配器
///
/// 规范化的拉单/回写契约。拉单使用 offset/limit 分页加状态过滤，
/// 回写覆盖三类：tracking 上传、订单状态更新、发货确认。
#[async_trait]
pub trait MarketplaceAdapter: Send + Sync {
    /// 分页拉取订单
    async fn get_orders(&self, query: &OrderQuery) -> AppResult<OrderPage>;

    /// 查询单个订单详情
    async fn get_order_details(&self, order_id: &str) -> AppResult<MarketplaceOrder>;

    /// 上传 tracking 信息
    async fn update_order_tracking(
        &self,
        order_id: &str,
        carrier_code: &str,
        carrier_name: &str,
        tracking_number: &str,
    ) -> AppResult<()>;

    /// 更新订单状态，可附失败原因
    async fn update_order_status(
        &self,
        order_id: &str,
        status: &str,
        reason: Option<&str>,
    ) -> AppResult<()>;

    /// 确认发货
    async fn update_order_ship(&self, order_id: &str) -> AppResult<()>;
}
