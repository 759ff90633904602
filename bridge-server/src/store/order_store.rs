//! 订单状态存储 - 进程内权威生命周期记录
//!
//! DashMap 按 key 分片加锁，entry 持有期间对同一订单的并发写
//! 互相串行，保证状态机检查与落盘是一个原子步骤。
//! 记录只增不删，终态订单保留作审计。

use dashmap::DashMap;
use shared::{
    AppError, AppResult, MarketplaceOrder, OrderFilter, OrderPatch, OrderRecord,
    util::now_millis,
};
use std::collections::HashMap;

pub struct OrderStore {
    orders: DashMap<String, OrderRecord>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
        }
    }

    /// 登记一个 marketplace 订单
    ///
    /// 已存在时只刷新 marketplace 状态，不触碰编排字段，
    /// 重复拉单不会把订单拉回 PENDING_POST。
    pub fn register(&self, order: &MarketplaceOrder) -> OrderRecord {
        let mut entry = self
            .orders
            .entry(order.order_id.clone())
            .or_insert_with(|| OrderRecord::from_marketplace(order));
        if entry.marketplace_status != order.status {
            entry.marketplace_status = order.status.clone();
            entry.updated_at = now_millis();
        }
        entry.clone()
    }

    /// 合并一个部分更新
    ///
    /// 状态变更先过前向性检查，非法转移整个 patch 原样拒绝，
    /// 记录不发生任何变化（updated_at 也不刷新）。
    pub fn apply(&self, order_id: &str, patch: OrderPatch) -> AppResult<OrderRecord> {
        let mut entry = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| AppError::order_not_found(order_id))?;

        if let Some(target) = patch.internal_state
            && !entry.internal_state.can_transition_to(target)
        {
            return Err(AppError::transition_rejected(format!(
                "order {} cannot move {} -> {}",
                order_id, entry.internal_state, target
            ))
            .with_detail("from", entry.internal_state.as_str())
            .with_detail("to", target.as_str()));
        }

        let record = &mut *entry;
        if let Some(v) = patch.marketplace_status {
            record.marketplace_status = v;
        }
        if let Some(v) = patch.carrier_code {
            record.carrier_code = Some(v);
        }
        if let Some(v) = patch.carrier_name {
            record.carrier_name = Some(v);
        }
        if let Some(v) = patch.tracking_number {
            record.tracking_number = Some(v);
        }
        if let Some(v) = patch.expedition_id {
            record.expedition_id = Some(v);
        }
        if let Some(v) = patch.carrier_status {
            record.carrier_status = Some(v);
        }
        if let Some(v) = patch.label_ref {
            record.label_ref = Some(v);
        }
        if let Some(v) = patch.internal_state {
            record.internal_state = v;
        }
        if let Some(v) = patch.last_event {
            record.last_event = Some(v);
        }
        if let Some(v) = patch.last_event_at {
            record.last_event_at = Some(v);
        }
        if let Some(v) = patch.error_message {
            record.error_message = Some(v);
        }
        if patch.bump_retry {
            record.retry_count += 1;
        }
        record.updated_at = now_millis();

        Ok(record.clone())
    }

    pub fn get(&self, order_id: &str) -> Option<OrderRecord> {
        self.orders.get(order_id).map(|r| r.clone())
    }

    /// 按 tracking number 或 expedition id 反查订单
    pub fn find_by_reference(&self, reference: &str) -> Option<OrderRecord> {
        self.orders
            .iter()
            .find(|r| {
                r.tracking_number.as_deref() == Some(reference)
                    || r.expedition_id.as_deref() == Some(reference)
            })
            .map(|r| r.clone())
    }

    /// 过滤查询，结果按 created_at 升序
    pub fn query(&self, filter: &OrderFilter) -> Vec<OrderRecord> {
        let mut records: Vec<OrderRecord> = self
            .orders
            .iter()
            .filter(|r| filter.matches(r))
            .map(|r| r.clone())
            .collect();
        records.sort_by_key(|r| (r.created_at, r.order_id.clone()));
        records
    }

    /// 各生命周期状态的订单数
    pub fn counts_by_state(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for record in self.orders.iter() {
            *counts
                .entry(record.internal_state.as_str().to_string())
                .or_insert(0) += 1;
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl Default for OrderStore {
    fn default() -> Self {
        Self::new()
    }
}
