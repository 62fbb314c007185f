//! 核心数据模型定义

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::IndexError;

/// 模态分类，用于按类别筛选系列
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModalityType {
    Image,        // 影像 (CT, MR, PT等)
    Plan,         // 治疗计划
    StructureSet, // 结构集
    Dose,         // 剂量
    PortalImage,  // 射野影像
    Record,       // 治疗记录
    Registration, // 配准
    Other,        // 其他
}

impl ModalityType {
    /// 根据DICOM模态代码进行分类
    pub fn classify(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "CT" | "MR" | "PT" | "NM" | "US" | "CR" | "DX" | "MG" | "XA" | "RF" | "OT" | "SC" => {
                ModalityType::Image
            }
            "RTPLAN" | "RTIONPLAN" => ModalityType::Plan,
            "RTSTRUCT" => ModalityType::StructureSet,
            "RTDOSE" => ModalityType::Dose,
            "RTIMAGE" => ModalityType::PortalImage,
            "RTRECORD" => ModalityType::Record,
            "REG" => ModalityType::Registration,
            _ => ModalityType::Other,
        }
    }
}

impl fmt::Display for ModalityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModalityType::Image => "image",
            ModalityType::Plan => "plan",
            ModalityType::StructureSet => "structure-set",
            ModalityType::Dose => "dose",
            ModalityType::PortalImage => "portal-image",
            ModalityType::Record => "record",
            ModalityType::Registration => "registration",
            ModalityType::Other => "other",
        };
        f.write_str(name)
    }
}

impl FromStr for ModalityType {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(ModalityType::Image),
            "plan" => Ok(ModalityType::Plan),
            "structure-set" | "structureset" => Ok(ModalityType::StructureSet),
            "dose" => Ok(ModalityType::Dose),
            "portal-image" | "portalimage" => Ok(ModalityType::PortalImage),
            "record" => Ok(ModalityType::Record),
            "registration" => Ok(ModalityType::Registration),
            "other" => Ok(ModalityType::Other),
            other => Err(IndexError::UnsupportedArgument(format!(
                "未知的模态类别: {other}"
            ))),
        }
    }
}

/// 模态值对象
///
/// 两个模态当且仅当代码相同时相等；分类由代码推导，序列化时只保留代码。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Modality {
    code: String,
    modality_type: ModalityType,
}

impl Modality {
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into().trim().to_string();
        let modality_type = ModalityType::classify(&code);
        Self {
            code,
            modality_type,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn modality_type(&self) -> ModalityType {
        self.modality_type
    }
}

impl PartialEq for Modality {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Modality {}

impl Hash for Modality {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl From<String> for Modality {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<Modality> for String {
    fn from(modality: Modality) -> Self {
        modality.code
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

/// 影像实例（层级的叶子节点）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Instance {
    pub instance_uid: String,      // SOP Instance UID
    pub series_uid: String,        // Series Instance UID
    pub patient_id: String,        // 患者ID
    pub modality: Modality,
    pub label: String,             // 显示标签
    pub machine: Option<String>,   // 规范化后的设备名
    pub file_path: PathBuf,        // 源文件路径
}

impl Instance {
    pub fn new(
        patient_id: impl Into<String>,
        series_uid: impl Into<String>,
        instance_uid: impl Into<String>,
        modality: Modality,
        file_path: impl Into<PathBuf>,
    ) -> Self {
        let modality_label = modality.code().to_string();
        Self {
            instance_uid: instance_uid.into(),
            series_uid: series_uid.into(),
            patient_id: patient_id.into(),
            modality,
            label: modality_label,
            machine: None,
            file_path: file_path.into(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_machine(mut self, machine: Option<String>) -> Self {
        self.machine = machine;
        self
    }

    pub fn modality_type(&self) -> ModalityType {
        self.modality.modality_type()
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}
