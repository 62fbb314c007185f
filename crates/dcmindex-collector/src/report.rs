//! 扫描统计

use chrono::{DateTime, Utc};
use dcmindex_core::PatientStore;
use serde::Serialize;
use std::path::PathBuf;

/// 单个患者的汇总
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PatientSummary {
    pub patient_id: String,
    pub series_count: usize,
    pub instance_count: usize,
}

/// 一次扫描的统计信息
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub directories_scanned: usize,
    pub files_matched: usize,
    pub instances_added: usize,
    pub unrecognized_files: usize,
    pub incomplete_files: usize,
    pub duplicate_instances: usize,
    pub patients: Vec<PatientSummary>,
}

impl ScanReport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            started_at: Utc::now(),
            finished_at: None,
            directories_scanned: 0,
            files_matched: 0,
            instances_added: 0,
            unrecognized_files: 0,
            incomplete_files: 0,
            duplicate_instances: 0,
            patients: Vec::new(),
        }
    }

    /// 记录结束时间并生成患者汇总
    pub fn finish(&mut self, store: &PatientStore) {
        self.finished_at = Some(Utc::now());
        self.patients = summarize(store);
    }

    pub fn skipped_files(&self) -> usize {
        self.unrecognized_files + self.incomplete_files + self.duplicate_instances
    }
}

pub fn summarize(store: &PatientStore) -> Vec<PatientSummary> {
    store
        .iter()
        .map(|(patient_id, series)| PatientSummary {
            patient_id: patient_id.clone(),
            series_count: series.count(),
            instance_count: series.instance_count(),
        })
        .collect()
}
