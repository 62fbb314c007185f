//! # 收集模块
//!
//! 递归扫描目录，解析文件并构建 患者 -> 系列 -> 实例 三级索引。

pub mod cancel;
pub mod collector;
pub mod machine;
pub mod report;

pub use cancel::CancellationToken;
pub use collector::{Collector, ScanOutcome};
pub use machine::MachineMapping;
pub use report::{PatientSummary, ScanReport};
