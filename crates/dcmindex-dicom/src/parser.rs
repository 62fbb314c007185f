//! DICOM数据解析器
//!
//! 读取DICOM文件并提取建立索引所需的元数据

use dcmindex_core::utils::clean_dicom_text;
use dcmindex_core::{DatasetReader, IndexError, ParsedDicomObject, Result};
use dicom::core::value::{PrimitiveValue, Value};
use dicom::core::Tag;
use dicom::dictionary_std::tags;
use dicom::object::{DefaultDicomObject, InMemDicomObject, OpenFileOptions};
use std::fs::File;
use std::path::Path;
use tracing::{debug, trace};

/// DICOM数据解析器
#[derive(Debug, Clone, Copy, Default)]
pub struct DicomParser;

impl DicomParser {
    /// 创建新的DICOM解析器
    pub fn new() -> Self {
        Self
    }

    /// 解析DICOM文件
    ///
    /// 文件无法打开属于IO错误；能打开但不是DICOM格式则返回 [`IndexError::UnrecognizedFile`]。
    pub fn parse_file(&self, file_path: &Path) -> Result<ParsedDicomObject> {
        debug!("开始解析DICOM文件: {:?}", file_path);

        File::open(file_path).map_err(|e| IndexError::io(file_path, e))?;

        let obj = Self::open_header(file_path)?;

        let parsed = Self::extract_metadata(&obj);
        trace!("{}", parsed.get_summary());
        Ok(parsed)
    }

    /// 读取像素数据之前的所有属性
    fn open_header(file_path: &Path) -> Result<DefaultDicomObject> {
        OpenFileOptions::new()
            .read_until(tags::PIXEL_DATA)
            .open_file(file_path)
            .map_err(|e| IndexError::UnrecognizedFile {
                path: file_path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// 从DICOM对象中提取元数据
    fn extract_metadata(obj: &DefaultDicomObject) -> ParsedDicomObject {
        ParsedDicomObject {
            patient_id: Self::get_string_element(obj, tags::PATIENT_ID),
            patient_name: Self::get_string_element(obj, tags::PATIENT_NAME),
            study_instance_uid: Self::get_string_element(obj, tags::STUDY_INSTANCE_UID),
            series_instance_uid: Self::get_string_element(obj, tags::SERIES_INSTANCE_UID),
            modality: Self::get_string_element(obj, tags::MODALITY),
            sop_instance_uid: Self::get_string_element(obj, tags::SOP_INSTANCE_UID),
            label: Self::extract_label(obj),
            machine_name: Self::extract_machine_name(obj),
            manufacturer_model_name: Self::get_string_element(obj, tags::MANUFACTURER_MODEL_NAME),
        }
    }

    /// 计划与结构集有自己的标签，其余使用序列描述
    fn extract_label(obj: &InMemDicomObject) -> Option<String> {
        [tags::RT_PLAN_LABEL, tags::STRUCTURE_SET_LABEL, tags::SERIES_DESCRIPTION]
            .into_iter()
            .find_map(|tag| Self::get_string_element(obj, tag))
    }

    /// 治疗计划从射束序列中读取治疗机名称，否则退回到工作站名称
    fn extract_machine_name(obj: &InMemDicomObject) -> Option<String> {
        [tags::BEAM_SEQUENCE, tags::ION_BEAM_SEQUENCE]
            .into_iter()
            .filter_map(|sequence| obj.element(sequence).ok())
            .filter_map(|element| element.items())
            .flat_map(|items| items.iter())
            .find_map(|item| Self::get_string_element(item, tags::TREATMENT_MACHINE_NAME))
            .or_else(|| Self::get_string_element(obj, tags::STATION_NAME))
    }

    /// 获取字符串类型元素的第一个值
    fn get_string_element(obj: &InMemDicomObject, tag: Tag) -> Option<String> {
        match obj.element(tag) {
            Ok(element) => match element.value() {
                Value::Primitive(PrimitiveValue::Str(s)) => clean_dicom_text(s),
                Value::Primitive(PrimitiveValue::Strs(strings)) => {
                    strings.first().and_then(|s| clean_dicom_text(s))
                }
                _ => {
                    debug!("标签 {:?} 不是字符串类型", tag);
                    None
                }
            },
            Err(_) => {
                trace!("未找到标签: {:?}", tag);
                None
            }
        }
    }
}

impl DatasetReader for DicomParser {
    fn read(&self, path: &Path) -> Result<ParsedDicomObject> {
        self.parse_file(path)
    }
}
