use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{CarrierRegistry, MarketplaceAdapter, MiraklAdapter};
use crate::core::Config;
use crate::dispatch::{IdempotencyGuard, ShipmentDispatcher};
use crate::rules::CarrierSelector;
use crate::store::OrderStore;
use crate::tracking::{TrackingPoller, TrackingReconciler, WebhookAuthenticator};

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// # 服务组件
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | store | 订单状态存储 |
/// | selector | 承运商选择规则引擎 |
/// | carriers | 承运商注册表 |
/// | marketplace | Marketplace 适配器 |
/// | webhook_auth | webhook 验签器 |
/// | guard | 创建去重防护 |
/// | dispatcher | 运单调度器 |
/// | reconciler | tracking 对账器 |
/// | poller | 后台轮询器 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub store: Arc<OrderStore>,
    pub selector: Arc<CarrierSelector>,
    pub carriers: Arc<CarrierRegistry>,
    pub marketplace: Arc<dyn MarketplaceAdapter>,
    pub webhook_auth: Arc<WebhookAuthenticator>,
    pub guard: Arc<IdempotencyGuard>,
    pub dispatcher: Arc<ShipmentDispatcher>,
    pub reconciler: Arc<TrackingReconciler>,
    pub poller: Arc<TrackingPoller>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序组装：HTTP client、适配器、规则引擎、存储，
    /// 再把它们接进调度器与对账器。
    pub async fn initialize(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .unwrap_or_default();

        let marketplace: Arc<dyn MarketplaceAdapter> = Arc::new(MiraklAdapter::new(
            config.marketplace_base_url.clone(),
            config.marketplace_api_key.clone(),
            client.clone(),
            config.marketplace_mock,
        ));

        let carriers = Arc::new(CarrierRegistry::from_config(&config.carriers, &client));

        let selector = match &config.rules_config_path {
            Some(path) => match CarrierSelector::load_from_file(path) {
                Ok(selector) => {
                    tracing::info!(path = %path, rules = selector.len(), "carrier rules loaded from file");
                    Arc::new(selector)
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "rules file rejected, using defaults");
                    Arc::new(CarrierSelector::with_default_rules())
                }
            },
            None => Arc::new(CarrierSelector::with_default_rules()),
        };

        Self::assemble(config.clone(), marketplace, carriers, selector)
    }

    /// 用现成的组件组装状态（测试注入假适配器用）
    pub fn assemble(
        config: Config,
        marketplace: Arc<dyn MarketplaceAdapter>,
        carriers: Arc<CarrierRegistry>,
        selector: Arc<CarrierSelector>,
    ) -> Self {
        let store = Arc::new(OrderStore::new());
        let guard = Arc::new(IdempotencyGuard::new());
        let webhook_auth = Arc::new(WebhookAuthenticator::new(config.webhook_secrets.clone()));

        let dispatcher = Arc::new(ShipmentDispatcher::new(
            marketplace.clone(),
            carriers.clone(),
            selector.clone(),
            store.clone(),
            guard.clone(),
            config.fetch_status.clone(),
            config.fetch_page_size,
            config.fetch_max_pages,
        ));

        let reconciler = Arc::new(TrackingReconciler::new(
            store.clone(),
            marketplace.clone(),
            carriers.clone(),
            webhook_auth.clone(),
        ));

        let poller = Arc::new(TrackingPoller::new(
            reconciler.clone(),
            Duration::from_secs(config.poll_interval_secs),
        ));

        Self {
            config,
            store,
            selector,
            carriers,
            marketplace,
            webhook_auth,
            guard,
            dispatcher,
            reconciler,
            poller,
        }
    }

    /// 启动后台任务
    ///
    /// 必须在 `Server::run()` 之前调用
    pub async fn start_background_tasks(&self) {
        if self.config.poll_enabled {
            self.poller.start().await;
        } else {
            tracing::info!("tracking poller disabled by config");
        }
    }
}
