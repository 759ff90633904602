//! 规则引擎 - 按订单属性选择承运商
//!
//! 规则按优先级降序求值，第一条命中的规则决定承运商。
//! 规则集必须含有一条无条件规则（`Always`）作为兜底，
//! 这样任何订单都能选出承运商，选择永不失败。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{AppError, AppResult, MarketplaceOrder};

/// 规则条件
///
/// 订单缺失对应属性时条件视为不命中，而不是报错。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// 重量超过阈值 (kg)
    WeightOver { kg: f64 },
    /// 货到付款金额超过阈值
    CodOver { amount: Decimal },
    /// 指定服务类型（忽略大小写）
    ServiceType { value: String },
    /// 目的国不等于指定国家
    CountryNot { code: String },
    /// 无条件命中（兜底规则）
    Always,
}

impl Condition {
    pub fn matches(&self, order: &MarketplaceOrder) -> bool {
        match self {
            Condition::WeightOver { kg } => order.weight > *kg,
            Condition::CodOver { amount } => {
                order.cod_amount.map(|cod| cod > *amount).unwrap_or(false)
            }
            Condition::ServiceType { value } => order
                .service_type
                .as_deref()
                .map(|s| s.eq_ignore_ascii_case(value))
                .unwrap_or(false),
            Condition::CountryNot { code } => {
                !order.shipping.country.eq_ignore_ascii_case(code)
            }
            Condition::Always => true,
        }
    }
}

/// 一条选择规则
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionRule {
    pub name: String,
    /// 越大越先求值
    pub priority: i32,
    pub condition: Condition,
    pub carrier_code: String,
    pub carrier_name: String,
}

/// 承运商选择器
///
/// 构造时按优先级降序排序；同优先级保持配置顺序（稳定排序）。
pub struct CarrierSelector {
    rules: Vec<SelectionRule>,
}

impl CarrierSelector {
    /// 从规则集构造
    ///
    /// 校验规则集至少包含一条 `Always` 兜底规则
    pub fn from_rules(mut rules: Vec<SelectionRule>) -> AppResult<Self> {
        if !rules
            .iter()
            .any(|r| matches!(r.condition, Condition::Always))
        {
            return Err(AppError::config(
                "carrier rules must include an unconditional fallback rule",
            ));
        }
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(Self { rules })
    }

    /// 内置默认规则集
    pub fn with_default_rules() -> Self {
        // 兜底规则存在，from_rules 不会失败
        Self::from_rules(default_rules()).expect("default rules include a fallback")
    }

    /// 从 JSON 文件加载规则集
    pub fn load_from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("cannot read rules file {path}: {e}")))?;
        let rules: Vec<SelectionRule> = serde_json::from_str(&content)
            .map_err(|e| AppError::config(format!("invalid rules file {path}: {e}")))?;
        Self::from_rules(rules)
    }

    /// 为订单选择承运商
    ///
    /// 兜底规则保证一定有结果
    pub fn select(&self, order: &MarketplaceOrder) -> &SelectionRule {
        self.rules
            .iter()
            .find(|r| r.condition.matches(order))
            .expect("rule set validated to contain a fallback rule")
    }

    /// 返回订单命中的全部规则（按求值顺序）
    pub fn applicable_rules(&self, order: &MarketplaceOrder) -> Vec<&SelectionRule> {
        self.rules
            .iter()
            .filter(|r| r.condition.matches(order))
            .collect()
    }

    /// 规则集概览（按求值顺序）
    pub fn summary(&self) -> Vec<serde_json::Value> {
        self.rules
            .iter()
            .map(|r| {
                serde_json::json!({
                    "name": r.name,
                    "priority": r.priority,
                    "carrier_code": r.carrier_code,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// 内置默认规则
///
/// 超重走 UPS，货到付款走 TIPSA，加急与国际走 DHL，其余国内件走 TIPSA。
fn default_rules() -> Vec<SelectionRule> {
    vec![
        SelectionRule {
            name: "heavy_packages".to_string(),
            priority: 100,
            condition: Condition::WeightOver { kg: 20.0 },
            carrier_code: "ups".to_string(),
            carrier_name: "UPS".to_string(),
        },
        SelectionRule {
            name: "cod_orders".to_string(),
            priority: 90,
            condition: Condition::CodOver {
                amount: Decimal::ZERO,
            },
            carrier_code: "tipsa".to_string(),
            carrier_name: "TIPSA".to_string(),
        },
        SelectionRule {
            name: "express_service".to_string(),
            priority: 80,
            condition: Condition::ServiceType {
                value: "express".to_string(),
            },
            carrier_code: "dhl".to_string(),
            carrier_name: "DHL Express".to_string(),
        },
        SelectionRule {
            name: "international".to_string(),
            priority: 70,
            condition: Condition::CountryNot {
                code: "ES".to_string(),
            },
            carrier_code: "dhl".to_string(),
            carrier_name: "DHL Express".to_string(),
        },
        SelectionRule {
            name: "default_domestic".to_string(),
            priority: 0,
            condition: Condition::Always,
            carrier_code: "tipsa".to_string(),
            carrier_name: "TIPSA".to_string(),
        },
    ]
}
