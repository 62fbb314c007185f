//! # 管理模块
//!
//! 提供配置加载、配置校验和日志初始化

pub mod config;
pub mod logging;

pub use config::{CollectorConfig, ConfigValidator, LoggingConfig, ScanConfig};
pub use logging::{init_logging, with_bootstrap_logging};
