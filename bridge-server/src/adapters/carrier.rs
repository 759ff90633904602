//! 承运商适配器接口
//!
//! 所有承运商（TIPSA/DHL/UPS/GLS...）统一实现 [`CarrierAdapter`]，
//! 调度与对账逻辑只依赖这个接口，不关心具体的线协议。

use async_trait::async_trait;
use shared::{
    AppResult, BulkCreateResult, CancelResult, FailedShipment, MarketplaceOrder, ShipmentResult,
    StatusResult,
};

/// 承运商适配器
#[async_trait]
pub trait CarrierAdapter: Send + Sync {
    /// 承运商代码，如 "tipsa"
    fn carrier_code(&self) -> &str;

    /// 承运商展示名称
    fn carrier_name(&self) -> &str;

    /// 是否 mock 模式（无网络调用）
    fn is_mock_mode(&self) -> bool;

    /// 创建单个运单
    async fn create_shipment(&self, order: &MarketplaceOrder) -> AppResult<ShipmentResult>;

    /// 批量创建运单
    ///
    /// 默认实现逐单调用 [`create_shipment`](Self::create_shipment)，
    /// 单个订单失败不会中断整批，结果保持输入顺序。
    async fn create_shipments_bulk(
        &self,
        orders: &[MarketplaceOrder],
    ) -> AppResult<BulkCreateResult> {
        let mut result = BulkCreateResult::default();
        for order in orders {
            match self.create_shipment(order).await {
                Ok(shipment) => {
                    result.shipments.push(shipment);
                    result.total_created += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        order_id = %order.order_id,
                        carrier = self.carrier_code(),
                        error = %e,
                        "shipment creation failed"
                    );
                    result.failed.push(FailedShipment {
                        order_id: order.order_id.clone(),
                        error: e.to_string(),
                    });
                    result.total_failed += 1;
                }
            }
        }
        Ok(result)
    }

    /// 查询运单当前状态
    async fn get_shipment_status(&self, tracking_number: &str) -> AppResult<StatusResult>;

    /// 下载运单标签 (PDF 字节)
    async fn get_shipment_label(&self, expedition_id: &str) -> AppResult<Vec<u8>>;

    /// 取消运单
    async fn cancel_shipment(&self, expedition_id: &str) -> AppResult<CancelResult>;
}
