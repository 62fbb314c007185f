//! 配置管理
//!
//! 从TOML文件和 `DCMINDEX_` 前缀的环境变量加载收集器配置，并进行校验

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use dcmindex_collector::MachineMapping;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// 收集器完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CollectorConfig {
    /// 扫描配置
    pub scan: ScanConfig,
    /// 设备映射表
    pub machines: MachineMapping,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 扫描配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScanConfig {
    /// 扫描根目录
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// 文件名通配符
    pub pattern: String,
    /// 文件名匹配是否区分大小写
    pub case_sensitive: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别或过滤指令
    pub level: String,
    /// 输出格式: text / json
    pub format: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: None,
            pattern: "*".to_string(),
            case_sensitive: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl CollectorConfig {
    /// 加载配置：可选的配置文件，再叠加环境变量
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        let settings = builder
            .add_source(Environment::with_prefix("DCMINDEX").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: CollectorConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        ConfigValidator::new().validate(&config)?;

        match config_path {
            Some(path) => info!("Configuration loaded successfully from: {:?}", path),
            None => info!("Configuration loaded from defaults and environment"),
        }
        Ok(config)
    }

    /// 以TOML格式输出配置
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    /// 验证规则
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: &'static str,
    /// 验证函数
    validator: fn(&CollectorConfig) -> Result<()>,
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "scan.pattern",
                validator: |config| {
                    if config.scan.pattern.trim().is_empty() {
                        Err(anyhow::anyhow!("File pattern cannot be empty"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "logging.level",
                validator: |config| {
                    EnvFilter::try_new(&config.logging.level)
                        .map(|_| ())
                        .map_err(|e| anyhow::anyhow!("Invalid log filter: {}", e))
                },
            },
            ValidationRule {
                field_path: "logging.format",
                validator: |config| match config.logging.format.as_str() {
                    "text" | "json" => Ok(()),
                    other => Err(anyhow::anyhow!("Unsupported log format: {}", other)),
                },
            },
            ValidationRule {
                field_path: "machines",
                validator: |config| {
                    let tables = [&config.machines.machines, &config.machines.default_by_model];
                    let blank = tables
                        .iter()
                        .flat_map(|table| table.iter())
                        .any(|(key, value)| key.trim().is_empty() || value.trim().is_empty());
                    if blank {
                        Err(anyhow::anyhow!("Machine mapping entries cannot be blank"))
                    } else {
                        Ok(())
                    }
                },
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &CollectorConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(e.context(format!("Invalid configuration value: {}", rule.field_path)));
            }
        }

        info!("Configuration validation passed");
        Ok(())
    }
}
