//! 三级索引存储：患者 -> 系列 -> 实例

mod instance;
mod patient;
mod series;
mod view;

pub use instance::InstanceStore;
pub use patient::PatientStore;
pub use series::{Series, SeriesStore};
pub use view::{PatientStoreView, SeriesStoreView};
