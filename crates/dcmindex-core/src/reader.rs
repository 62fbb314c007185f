//! 数据集读取接口
//!
//! 文件解析由外部实现（见 `dcmindex-dicom`），收集器只依赖此处定义的接口。

use std::path::Path;

use crate::error::Result;

/// 从单个文件读取数据集
///
/// 实现应当将“不是可识别的DICOM文件”报告为 [`IndexError::UnrecognizedFile`]，
/// 将其他IO失败报告为 [`IndexError::Io`]。
///
/// [`IndexError::UnrecognizedFile`]: crate::IndexError::UnrecognizedFile
/// [`IndexError::Io`]: crate::IndexError::Io
pub trait DatasetReader {
    fn read(&self, path: &Path) -> Result<ParsedDicomObject>;
}

impl<R: DatasetReader + ?Sized> DatasetReader for &R {
    fn read(&self, path: &Path) -> Result<ParsedDicomObject> {
        (**self).read(path)
    }
}

/// 解析后的DICOM对象（仅包含建立索引所需的属性）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDicomObject {
    // === 患者信息 ===
    /// 患者ID
    pub patient_id: Option<String>,
    /// 患者姓名
    pub patient_name: Option<String>,

    // === 检查/序列信息 ===
    /// 检查实例UID
    pub study_instance_uid: Option<String>,
    /// 序列实例UID
    pub series_instance_uid: Option<String>,
    /// 模态
    pub modality: Option<String>,

    // === 实例信息 ===
    /// SOP实例UID
    pub sop_instance_uid: Option<String>,
    /// 显示标签 (RTPlanLabel / StructureSetLabel / SeriesDescription)
    pub label: Option<String>,

    // === 设备信息 ===
    /// 治疗机名称或工作站名称
    pub machine_name: Option<String>,
    /// 制造商型号
    pub manufacturer_model_name: Option<String>,
}

impl ParsedDicomObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回第一个缺失的必要属性名称
    pub fn missing_attribute(&self) -> Option<&'static str> {
        let required = [
            ("PatientID", &self.patient_id),
            ("SeriesInstanceUID", &self.series_instance_uid),
            ("SOPInstanceUID", &self.sop_instance_uid),
        ];

        required
            .into_iter()
            .find(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| name)
    }

    /// 获取DICOM对象的摘要信息
    pub fn get_summary(&self) -> String {
        format!(
            "DICOM对象: 患者ID={}, 序列UID={}, 实例UID={}, 模态={}",
            self.patient_id.as_deref().unwrap_or("未知"),
            self.series_instance_uid.as_deref().unwrap_or("未知"),
            self.sop_instance_uid.as_deref().unwrap_or("未知"),
            self.modality.as_deref().unwrap_or("未知")
        )
    }
}
