//! 日志初始化

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// 初始化全局日志订阅器
///
/// 设置了 `RUST_LOG` 时优先使用环境变量，否则使用配置中的级别。
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| anyhow!("Invalid log filter {}: {}", config.level, e))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.format.as_str() {
        "json" => builder.json().try_init(),
        _ => builder.try_init(),
    };

    result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

/// 在全局日志初始化之前执行 `f`
///
/// 配置加载阶段的事件使用默认级别输出到标准错误。
pub fn with_bootstrap_logging<T>(f: impl FnOnce() -> T) -> T {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}
