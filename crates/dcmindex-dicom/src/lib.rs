//! # DICOM读取模块
//!
//! 基于 `dicom` 库实现核心模块的 [`DatasetReader`](dcmindex_core::DatasetReader) 接口。

pub mod parser;

pub use parser::DicomParser;
