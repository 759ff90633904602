use std::collections::HashMap;

/// 服务器配置 - 编排核心的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | HTTP_PORT | 8080 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_DIR | (无) | 日志文件目录，未设置时只输出到控制台 |
/// | MARKETPLACE_BASE_URL | http://localhost:3001 | Marketplace API 地址 |
/// | MARKETPLACE_API_KEY | (空) | Marketplace API key |
/// | MARKETPLACE_MOCK | true | Marketplace 是否使用 mock 模式 |
/// | FETCH_STATUS | PENDING | 拉单的状态过滤器 |
/// | FETCH_PAGE_SIZE | 100 | 拉单分页大小 |
/// | FETCH_MAX_PAGES | 20 | 拉单页数上限（防止无限循环） |
/// | CONNECT_TIMEOUT_MS | 5000 | 出站连接超时(毫秒) |
/// | REQUEST_TIMEOUT_MS | 15000 | 出站请求总超时(毫秒) |
/// | POLL_ENABLED | true | 是否启动后台 tracking 轮询 |
/// | POLL_INTERVAL_SECS | 300 | 轮询间隔(秒) |
/// | RULES_CONFIG_PATH | (无) | 承运商选择规则 JSON 文件 |
/// | CARRIERS_MOCK | true | 承运商适配器是否使用 mock 模式 |
/// | WEBHOOK_SECRET_<CODE> | 开发默认值 | 各承运商 webhook 共享密钥 |
///
/// # 示例
///
/// ```ignore
/// MARKETPLACE_MOCK=false HTTP_PORT=9000 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 日志目录（可选，启用每日滚动文件输出）
    pub log_dir: Option<String>,

    // === Marketplace ===
    /// Marketplace API 地址
    pub marketplace_base_url: String,
    /// Marketplace API key
    pub marketplace_api_key: String,
    /// Marketplace 是否 mock 模式（无网络调用，返回确定性数据）
    pub marketplace_mock: bool,
    /// 拉单状态过滤器（规范化的 fetch 契约）
    pub fetch_status: String,
    /// 拉单分页大小
    pub fetch_page_size: usize,
    /// 拉单页数硬上限
    pub fetch_max_pages: usize,

    // === 出站 HTTP ===
    /// 连接超时(毫秒)
    pub connect_timeout_ms: u64,
    /// 请求总超时(毫秒)
    pub request_timeout_ms: u64,

    // === Tracking 轮询 ===
    /// 是否随服务启动后台轮询
    pub poll_enabled: bool,
    /// 轮询间隔(秒)
    pub poll_interval_secs: u64,

    // === 规则引擎 ===
    /// 规则配置文件路径（可选，未设置时使用内置默认规则）
    pub rules_config_path: Option<String>,

    // === 承运商 ===
    /// 已配置的承运商
    pub carriers: Vec<CarrierConfig>,
    /// 各承运商 webhook 共享密钥 (code -> secret)
    pub webhook_secrets: HashMap<String, String>,
}

/// 单个承运商的接入配置
#[derive(Debug, Clone)]
pub struct CarrierConfig {
    /// 承运商代码，如 "tipsa"
    pub code: String,
    /// 展示名称，如 "TIPSA"
    pub name: String,
    /// API 基础地址
    pub base_url: String,
    /// 认证方式
    pub auth: CarrierAuth,
    /// mock 模式（无网络调用）
    pub mock_mode: bool,
}

/// 承运商认证方式
///
/// 支持 OAuth2 client-credentials 的承运商使用 `OAuth2`，
/// 其余使用静态 Basic 凭证。
#[derive(Debug, Clone)]
pub enum CarrierAuth {
    /// 静态 Basic 凭证
    Basic { username: String, password: String },
    /// OAuth2 client-credentials
    OAuth2 {
        token_url: String,
        client_id: String,
        client_secret: String,
    },
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let carriers_mock = env_bool("CARRIERS_MOCK", true);

        Self {
            http_port: env_parse("HTTP_PORT", 8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_dir: std::env::var("LOG_DIR").ok(),

            marketplace_base_url: std::env::var("MARKETPLACE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3001".into()),
            marketplace_api_key: std::env::var("MARKETPLACE_API_KEY").unwrap_or_default(),
            marketplace_mock: env_bool("MARKETPLACE_MOCK", true),
            fetch_status: std::env::var("FETCH_STATUS").unwrap_or_else(|_| "PENDING".into()),
            fetch_page_size: env_parse("FETCH_PAGE_SIZE", 100),
            fetch_max_pages: env_parse("FETCH_MAX_PAGES", 20),

            connect_timeout_ms: env_parse("CONNECT_TIMEOUT_MS", 5000),
            request_timeout_ms: env_parse("REQUEST_TIMEOUT_MS", 15000),

            poll_enabled: env_bool("POLL_ENABLED", true),
            poll_interval_secs: env_parse("POLL_INTERVAL_SECS", 300),

            rules_config_path: std::env::var("RULES_CONFIG_PATH").ok(),

            carriers: default_carriers(carriers_mock),
            webhook_secrets: default_webhook_secrets(),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(http_port: u16, poll_interval_secs: u64) -> Self {
        let mut config = Self::from_env();
        config.http_port = http_port;
        config.poll_interval_secs = poll_interval_secs;
        config
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 查找承运商配置
    pub fn carrier(&self, code: &str) -> Option<&CarrierConfig> {
        self.carriers.iter().find(|c| c.code == code)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// 内置承运商清单
///
/// base_url 与凭证均可用 `<CODE>_BASE_URL` / `<CODE>_USERNAME` /
/// `<CODE>_PASSWORD` 覆盖；GLS 走 OAuth2，另有 `GLS_AUTH_URL` /
/// `GLS_CLIENT_ID` / `GLS_CLIENT_SECRET`。
fn default_carriers(mock: bool) -> Vec<CarrierConfig> {
    vec![
        CarrierConfig {
            code: "tipsa".into(),
            name: "TIPSA".into(),
            base_url: env_or("TIPSA_BASE_URL", "https://api.tipsa.example/v1"),
            auth: CarrierAuth::Basic {
                username: env_or("TIPSA_USERNAME", "tipsa-dev"),
                password: env_or("TIPSA_PASSWORD", ""),
            },
            mock_mode: mock,
        },
        CarrierConfig {
            code: "dhl".into(),
            name: "DHL Express".into(),
            base_url: env_or("DHL_BASE_URL", "https://api.dhl.example/v2"),
            auth: CarrierAuth::Basic {
                username: env_or("DHL_USERNAME", "dhl-dev"),
                password: env_or("DHL_PASSWORD", ""),
            },
            mock_mode: mock,
        },
        CarrierConfig {
            code: "ups".into(),
            name: "UPS".into(),
            base_url: env_or("UPS_BASE_URL", "https://api.ups.example/v1"),
            auth: CarrierAuth::Basic {
                username: env_or("UPS_USERNAME", "ups-dev"),
                password: env_or("UPS_PASSWORD", ""),
            },
            mock_mode: mock,
        },
        CarrierConfig {
            code: "gls".into(),
            name: "GLS".into(),
            base_url: env_or("GLS_BASE_URL", "https://api.gls.example/shipit"),
            auth: CarrierAuth::OAuth2 {
                token_url: env_or("GLS_AUTH_URL", "https://auth.gls.example/oauth2/token"),
                client_id: env_or("GLS_CLIENT_ID", "gls-dev"),
                client_secret: env_or("GLS_CLIENT_SECRET", ""),
            },
            mock_mode: mock,
        },
    ]
}

/// 各承运商 webhook 密钥
///
/// 开发默认值仅用于本地联调，生产环境必须用环境变量覆盖。
fn default_webhook_secrets() -> HashMap<String, String> {
    ["tipsa", "dhl", "ups", "gls"]
        .into_iter()
        .map(|code| {
            let env_key = format!("WEBHOOK_SECRET_{}", code.to_uppercase());
            let secret = std::env::var(&env_key)
                .unwrap_or_else(|_| format!("{code}-webhook-secret-dev"));
            (code.to_string(), secret)
        })
        .collect()
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
