//! # DCMIndex Core
//!
//! 索引系统的核心模块，提供数据模型、错误定义、三级索引存储和读取接口。

pub mod error;
pub mod models;
pub mod reader;
pub mod store;
pub mod utils;

pub use error::{IndexError, Result};
pub use models::*;
pub use reader::{DatasetReader, ParsedDicomObject};
pub use store::{InstanceStore, PatientStore, PatientStoreView, Series, SeriesStore, SeriesStoreView};
