//! 工具模块

pub mod logger;

pub use logger::{init_logger, init_logger_with_file};

// Re-export 共享错误类型，方便 handler 直接引用
pub use shared::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
