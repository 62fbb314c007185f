//! 错误定义模块

use std::path::PathBuf;
use thiserror::Error;

/// 索引系统统一错误类型
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("无法识别的DICOM文件 {path:?}: {reason}")]
    UnrecognizedFile { path: PathBuf, reason: String },

    #[error("DICOM文件 {path:?} 缺少必要属性: {attribute}")]
    MissingAttribute { path: PathBuf, attribute: &'static str },

    #[error("实例 {instance_uid} 已存在: 保留 {existing:?}, 拒绝 {rejected:?}")]
    DuplicateInstance {
        instance_uid: String,
        existing: PathBuf,
        rejected: PathBuf,
    },

    #[error("系列 {series_uid} 模态不一致: 已记录 {expected}, 文件 {path:?} 为 {found}")]
    ModalityMismatch {
        series_uid: String,
        expected: String,
        found: String,
        path: PathBuf,
    },

    #[error("不支持的参数: {0}")]
    UnsupportedArgument(String),

    #[error("无效的文件匹配模式: {0}")]
    InvalidPattern(String),

    #[error("IO错误 {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("扫描已取消")]
    Cancelled,
}

impl IndexError {
    /// 该错误是否可以在本地恢复（记录警告后继续扫描）
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IndexError::UnrecognizedFile { .. }
                | IndexError::MissingAttribute { .. }
                | IndexError::DuplicateInstance { .. }
        )
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::Io {
            path: path.into(),
            source,
        }
    }
}

/// 索引系统统一结果类型
pub type Result<T> = std::result::Result<T, IndexError>;
