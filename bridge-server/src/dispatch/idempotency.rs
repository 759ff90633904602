//! 创建去重防护
//!
//! 以订单指纹为 key 缓存已创建的运单，重复调度同一订单时直接
//! 复用结果，不再打到承运商。指纹由订单号加收件关键字段派生，
//! 同一订单的重复投递一定命中，字段变化则视为新请求。
//!
//! 创建权通过占位认领：调度先 [`claim`](IdempotencyGuard::claim)
//! 拿到 `Reserved` 才允许外呼，创建期间并发认领同一指纹只会拿到
//! `InFlight`，同一指纹对承运商的创建调用至多一次。
//! 创建失败 [`release`](IdempotencyGuard::release) 释放占位，重试
//! 可以重新认领；失败不缓存。缓存只进不出，进程生命周期内有效。

use std::collections::HashMap;

use shared::{MarketplaceOrder, ShipmentResult, util::short_sha256};
use tokio::sync::Mutex;

enum Slot {
    /// 占位中，创建调用尚未返回
    Pending,
    /// 已创建完成的运单
    Done(ShipmentResult),
}

/// 认领结果
pub enum Claim {
    /// 已创建过，直接复用
    Cached(ShipmentResult),
    /// 占位成功，本调用持有创建权
    Reserved,
    /// 另一个调度正在创建，本轮跳过
    InFlight,
}

pub struct IdempotencyGuard {
    cache: Mutex<HashMap<String, Slot>>,
}

impl IdempotencyGuard {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// 订单指纹: sha256(order_id|weight|postcode|city) 前 16 位 hex
    pub fn fingerprint(order: &MarketplaceOrder) -> String {
        short_sha256(&format!(
            "{}|{}|{}|{}",
            order.order_id, order.weight, order.shipping.postcode, order.shipping.city
        ))
    }

    /// 认领订单的创建权
    pub async fn claim(&self, order: &MarketplaceOrder) -> Claim {
        let mut cache = self.cache.lock().await;
        match cache.get(&Self::fingerprint(order)) {
            Some(Slot::Done(result)) => Claim::Cached(result.clone()),
            Some(Slot::Pending) => Claim::InFlight,
            None => {
                cache.insert(Self::fingerprint(order), Slot::Pending);
                Claim::Reserved
            }
        }
    }

    /// 查已完成的创建结果，占位中的指纹不算命中
    pub async fn lookup(&self, order: &MarketplaceOrder) -> Option<ShipmentResult> {
        match self.cache.lock().await.get(&Self::fingerprint(order)) {
            Some(Slot::Done(result)) => Some(result.clone()),
            _ => None,
        }
    }

    /// 记录创建结果，兑现占位
    pub async fn record(&self, order: &MarketplaceOrder, result: &ShipmentResult) {
        self.cache
            .lock()
            .await
            .insert(Self::fingerprint(order), Slot::Done(result.clone()));
    }

    /// 释放未兑现的占位，已完成的结果不受影响
    pub async fn release(&self, order: &MarketplaceOrder) {
        let mut cache = self.cache.lock().await;
        let fingerprint = Self::fingerprint(order);
        if matches!(cache.get(&fingerprint), Some(Slot::Pending)) {
            cache.remove(&fingerprint);
        }
    }

    /// 已缓存的创建结果数（不含占位）
    pub async fn len(&self) -> usize {
        self.cache
            .lock()
            .await
            .values()
            .filter(|slot| matches!(slot, Slot::Done(_)))
            .count()
    }
}

impl Default for IdempotencyGuard {
    fn default() -> Self {
        Self::new()
    }
}
