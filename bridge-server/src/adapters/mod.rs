//! 外部系统适配器 - marketplace 与承运商
//!
//! # 模块结构
//!
//! - [`marketplace`] - Marketplace 适配器接口
//! - [`mirakl`] - Mirakl HTTP/mock 实现
//! - [`carrier`] - 承运商适配器接口
//! - [`http_carrier`] - 配置驱动的通用 HTTP 承运商实现
//! - [`oauth`] - OAuth2 token 缓存

pub mod carrier;
pub mod http_carrier;
pub mod marketplace;
pub mod mirakl;
pub mod oauth;

use std::collections::HashMap;
use std::sync::Arc;

use shared::{AppError, AppResult};

pub use carrier::CarrierAdapter;
pub use http_carrier::HttpCarrierAdapter;
pub use marketplace::MarketplaceAdapter;
pub use mirakl::MiraklAdapter;
pub use oauth::{OAuthTokenCache, TokenExchanger};

use crate::core::CarrierConfig;

/// 承运商注册表
///
/// code -> adapter 的只读映射，初始化后不再变更
pub struct CarrierRegistry {
    adapters: HashMap<String, Arc<dyn CarrierAdapter>>,
}

impl CarrierRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// 按配置构建所有承运商适配器
    pub fn from_config(configs: &[CarrierConfig], client: &reqwest::Client) -> Self {
        let mut registry = Self::new();
        for config in configs {
            registry.register(Arc::new(HttpCarrierAdapter::new(
                config.clone(),
                client.clone(),
            )));
        }
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn CarrierAdapter>) {
        self.adapters
            .insert(adapter.carrier_code().to_string(), adapter);
    }

    pub fn get(&self, code: &str) -> Option<Arc<dyn CarrierAdapter>> {
        self.adapters.get(code).cloned()
    }

    /// 查找承运商，未配置时返回错误
    pub fn require(&self, code: &str) -> AppResult<Arc<dyn CarrierAdapter>> {
        self.get(code).ok_or_else(|| {
            AppError::with_message(
                shared::ErrorCode::CarrierNotConfigured,
                format!("Carrier {code} is not configured"),
            )
            .with_detail("carrier_code", code.to_string())
        })
    }

    pub fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.adapters.keys().cloned().collect();
        codes.sort();
        codes
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for CarrierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// reqwest 错误归一化为承运商上游错误
pub(crate) fn map_carrier_err(code: &str, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::timeout(format!("{code}: request timed out"))
    } else {
        AppError::carrier(format!("{code}: {err}"))
    }
}

/// reqwest 错误归一化为 marketplace 上游错误
pub(crate) fn map_marketplace_err(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::timeout("marketplace request timed out")
    } else {
        AppError::marketplace(err.to_string())
    }
}
