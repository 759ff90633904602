//! Shipbridge - marketplace 与承运商之间的订单编排核心
//!
//! # 架构概述
//!
//! 本模块是 Shipbridge 服务端的主入口，提供以下核心功能：
//!
//! - **调度** (`dispatch`): 拉取 marketplace 待处理订单，批量创建运单
//! - **规则引擎** (`rules`): 按重量、COD、服务类型、目的国选择承运商
//! - **对账** (`tracking`): webhook 接入与后台轮询，双通道更新生命周期
//! - **适配器** (`adapters`): Mirakl 与各承运商的 HTTP/mock 实现
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! bridge-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── adapters/      # marketplace 与承运商适配器
//! ├── rules/         # 承运商选择规则引擎
//! ├── dispatch/      # 调度与创建去重
//! ├── store/         # 订单状态存储
//! ├── tracking/      # webhook 验签、对账、轮询
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志等工具
//! ```

pub mod adapters;
pub mod api;
pub mod core;
pub mod dispatch;
pub mod rules;
pub mod store;
pub mod tracking;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerState};
pub use dispatch::{DispatchReport, IdempotencyGuard, ShipmentDispatcher};
pub use rules::CarrierSelector;
pub use store::OrderStore;
pub use tracking::{TrackingPoller, TrackingReconciler, WebhookAuthenticator};

// Re-export unified error types from shared
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境 (dotenv + 日志)
pub fn setup_environment() {
    dotenv::dotenv().ok();
    let level = std::env::var("LOG_LEVEL").ok();
    let dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(level.as_deref(), dir.as_deref());
}

pub fn print_banner() {
    println!(
        r#"
   _____ __    _       __          _     __
  / ___// /_  (_)___  / /_  _____ (_)___/ /___ ____
  \__ \/ __ \/ / __ \/ __ \/ ___// / __  / __ `/ _ \
 ___/ / / / / / /_/ / /_/ / /   / / /_/ / /_/ /  __/
/____/_/ /_/_/ .___/_.___/_/   /_/\__,_/\__, /\___/
            /_/                        /____/
    "#
    );
}
