//! 目录收集器
//!
//! 递归扫描目录树，解析匹配的文件并写入患者索引。
//! 单个文件无法识别或缺少属性只记录警告；模态冲突、IO错误和取消会中止扫描。

use dcmindex_core::utils::is_valid_dicom_uid;
use dcmindex_core::{
    DatasetReader, Instance, IndexError, Modality, ParsedDicomObject, PatientStore, Result,
};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::cancel::CancellationToken;
use crate::machine::MachineMapping;
use crate::report::ScanReport;

/// 扫描结果
#[derive(Debug)]
pub struct ScanOutcome {
    pub store: PatientStore,
    pub report: ScanReport,
}

/// 目录收集器
#[derive(Debug)]
pub struct Collector<R> {
    reader: R,
    machines: MachineMapping,
    pattern: Pattern,
    match_options: MatchOptions,
    cancel: CancellationToken,
}

impl<R: DatasetReader> Collector<R> {
    /// 创建收集器；`pattern` 为文件名通配符，例如 `*` 或 `*.dcm`
    pub fn new(reader: R, machines: MachineMapping, pattern: &str) -> Result<Self> {
        let pattern = Pattern::new(pattern)
            .map_err(|e| IndexError::InvalidPattern(format!("{pattern}: {e}")))?;

        Ok(Self {
            reader,
            machines,
            pattern,
            match_options: MatchOptions::new(),
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.match_options.case_sensitive = case_sensitive;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// 扫描整个目录树
    ///
    /// 出现致命错误时不返回部分结果。
    pub fn collect(&self, root: &Path) -> Result<ScanOutcome> {
        info!("开始扫描: {:?} (匹配 {})", root, self.pattern.as_str());

        let mut store = PatientStore::new();
        let mut report = ScanReport::new(root);
        self.collect_into(root, &mut store, &mut report)?;
        report.finish(&store);

        for summary in &report.patients {
            info!(
                "患者 {}: {} 个系列, {} 个实例",
                summary.patient_id, summary.series_count, summary.instance_count
            );
        }
        info!(
            "扫描完成: {} 个目录, {} 个文件, 新增 {} 个实例, 跳过 {} 个文件",
            report.directories_scanned,
            report.files_matched,
            report.instances_added,
            report.skipped_files()
        );

        Ok(ScanOutcome { store, report })
    }

    /// 扫描目录树并写入已有的索引
    ///
    /// 出错时 `store` 保留出错前已经插入的记录。
    pub fn collect_into(
        &self,
        dir: &Path,
        store: &mut PatientStore,
        report: &mut ScanReport,
    ) -> Result<()> {
        self.check_cancelled()?;

        let (files, subdirs) = self.list_directory(dir)?;
        report.directories_scanned += 1;
        report.files_matched += files.len();
        info!("扫描目录 {:?}: 找到 {} 个文件", dir, files.len());

        for file in &files {
            self.check_cancelled()?;
            self.process_file(file, store, report)?;
        }

        for subdir in &subdirs {
            self.collect_into(subdir, store, report)?;
        }

        Ok(())
    }

    /// 列出当前目录中匹配的文件和子目录（按文件名排序）
    fn list_directory(&self, dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
        let mut files = Vec::new();
        let mut subdirs = Vec::new();

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                IndexError::io(path, e.into())
            })?;

            let file_type = entry.file_type();
            if file_type.is_dir() {
                subdirs.push(entry.into_path());
            } else if file_type.is_file() && self.matches(&entry.file_name().to_string_lossy()) {
                files.push(entry.into_path());
            }
        }

        Ok((files, subdirs))
    }

    fn matches(&self, file_name: &str) -> bool {
        self.pattern.matches_with(file_name, self.match_options)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            warn!("扫描被取消");
            return Err(IndexError::Cancelled);
        }
        Ok(())
    }

    fn process_file(&self, path: &Path, store: &mut PatientStore, report: &mut ScanReport) -> Result<()> {
        let parsed = match self.reader.read(path) {
            Ok(parsed) => parsed,
            Err(err @ IndexError::UnrecognizedFile { .. }) => {
                warn!("{}", err);
                report.unrecognized_files += 1;
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let instance = match self.derive_instance(path, parsed) {
            Ok(instance) => instance,
            Err(err @ IndexError::MissingAttribute { .. }) => {
                warn!("{}", err);
                report.incomplete_files += 1;
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        self.insert(instance, store, report)
    }

    /// 由解析结果构造实例，设备名按映射表规范化
    fn derive_instance(&self, path: &Path, parsed: ParsedDicomObject) -> Result<Instance> {
        if let Some(attribute) = parsed.missing_attribute() {
            return Err(IndexError::MissingAttribute {
                path: path.to_path_buf(),
                attribute,
            });
        }

        let ParsedDicomObject {
            patient_id,
            series_instance_uid,
            sop_instance_uid,
            modality,
            label,
            machine_name,
            manufacturer_model_name,
            ..
        } = parsed;

        let machine = self
            .machines
            .normalize(machine_name.as_deref(), manufacturer_model_name.as_deref());

        let mut instance = Instance::new(
            patient_id.unwrap_or_default(),
            series_instance_uid.unwrap_or_default(),
            sop_instance_uid.unwrap_or_default(),
            Modality::new(modality.unwrap_or_default()),
            path,
        )
        .with_machine(machine);
        if let Some(label) = label {
            instance = instance.with_label(label);
        }

        if !is_valid_dicom_uid(&instance.instance_uid) {
            debug!("非标准实例UID {:?}: {:?}", instance.instance_uid, path);
        }

        Ok(instance)
    }

    /// 逐级检查 患者 -> 系列 -> 实例 是否已存在；重复实例保留先出现的文件
    fn insert(&self, instance: Instance, store: &mut PatientStore, report: &mut ScanReport) -> Result<()> {
        if let Some(existing) = store
            .try_get(&instance.patient_id)
            .and_then(|patient| patient.get(&instance.series_uid))
            .and_then(|series| series.instances().try_get(&instance.instance_uid))
        {
            let err = IndexError::DuplicateInstance {
                instance_uid: instance.instance_uid,
                existing: existing.file_path.clone(),
                rejected: instance.file_path,
            };
            warn!("{}", err);
            report.duplicate_instances += 1;
            return Ok(());
        }

        store.add(instance)?;
        report.instances_added += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmindex_core::ModalityType;
    use std::collections::BTreeMap;
    use std::fs;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// 收集日志输出的缓冲区
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    /// 测试用读取器：文件内容为 `key=value` 行，首行必须是 `DICM`
    #[derive(Debug)]
    struct KeyValueReader;

    impl DatasetReader for KeyValueReader {
        fn read(&self, path: &Path) -> Result<ParsedDicomObject> {
            let text = fs::read_to_string(path).map_err(|e| IndexError::io(path, e))?;
            let mut lines = text.lines();
            if lines.next() != Some("DICM") {
                return Err(IndexError::UnrecognizedFile {
                    path: path.to_path_buf(),
                    reason: "missing DICM marker".to_string(),
                });
            }

            let mut parsed = ParsedDicomObject::new();
            for line in lines {
                let Some((key, value)) = line.split_once('=') else {
                    continue;
                };
                let value = Some(value.to_string());
                match key {
                    "patient" => parsed.patient_id = value,
                    "series" => parsed.series_instance_uid = value,
                    "instance" => parsed.sop_instance_uid = value,
                    "modality" => parsed.modality = value,
                    "label" => parsed.label = value,
                    "machine" => parsed.machine_name = value,
                    "model" => parsed.manufacturer_model_name = value,
                    _ => {}
                }
            }
            Ok(parsed)
        }
    }

    fn write_dataset(path: &Path, fields: &[(&str, &str)]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut text = String::from("DICM\n");
        for (key, value) in fields {
            text.push_str(&format!("{key}={value}\n"));
        }
        fs::write(path, text).unwrap();
    }

    fn collector(pattern: &str) -> Collector<KeyValueReader> {
        Collector::new(KeyValueReader, MachineMapping::default(), pattern).unwrap()
    }

    #[test]
    fn test_series_collects_distinct_instances() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(
            &dir.path().join("a.dcm"),
            &[("patient", "P1"), ("series", "S1"), ("instance", "I1"), ("modality", "CT")],
        );
        write_dataset(
            &dir.path().join("b.dcm"),
            &[("patient", "P1"), ("series", "S1"), ("instance", "I2"), ("modality", "CT")],
        );

        let outcome = collector("*").collect(dir.path()).unwrap();
        let (modality, instances) = outcome.store.try_get("P1").unwrap().try_get_series("S1").unwrap();
        assert_eq!(modality.code(), "CT");
        assert_eq!(instances.count(), 2);
        assert_eq!(outcome.report.instances_added, 2);
        assert_eq!(outcome.report.patients.len(), 1);
        assert_eq!(outcome.report.patients[0].series_count, 1);
    }

    #[test]
    fn test_duplicate_instance_keeps_first_seen() {
        let dir = tempfile::tempdir().unwrap();
        let fields = [("patient", "P1"), ("series", "S1"), ("instance", "I1"), ("modality", "CT")];
        write_dataset(&dir.path().join("a.dcm"), &fields);
        write_dataset(&dir.path().join("b.dcm"), &fields);

        let outcome = collector("*").collect(dir.path()).unwrap();
        let patient = outcome.store.try_get("P1").unwrap();
        let instance = patient.try_get_instance("S1", "I1").unwrap();
        assert_eq!(instance.file_path, dir.path().join("a.dcm"));
        assert_eq!(patient.instance_count(), 1);
        assert_eq!(outcome.report.duplicate_instances, 1);
    }

    #[test]
    fn test_duplicate_warning_names_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let fields = [("patient", "P1"), ("series", "S1"), ("instance", "I1"), ("modality", "CT")];
        let first = dir.path().join("a.dcm");
        let second = dir.path().join("b.dcm");
        write_dataset(&first, &fields);
        write_dataset(&second, &fields);

        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let outcome = {
            let _guard = tracing::subscriber::set_default(subscriber);
            collector("*").collect(dir.path()).unwrap()
        };
        assert_eq!(outcome.report.duplicate_instances, 1);

        let logs = buffer.contents();
        let line = logs
            .lines()
            .find(|line| line.contains("WARN") && line.contains("I1"))
            .unwrap();
        assert!(line.contains(&format!("{:?}", first)));
        assert!(line.contains(&format!("{:?}", second)));
    }

    #[test]
    fn test_modality_conflict_aborts_scan() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(
            &dir.path().join("a.dcm"),
            &[("patient", "P1"), ("series", "S1"), ("instance", "I1"), ("modality", "CT")],
        );
        write_dataset(
            &dir.path().join("b.dcm"),
            &[("patient", "P1"), ("series", "S1"), ("instance", "I2"), ("modality", "MR")],
        );

        let err = collector("*").collect(dir.path()).unwrap_err();
        match err {
            IndexError::ModalityMismatch {
                series_uid, path, ..
            } => {
                assert_eq!(series_uid, "S1");
                assert_eq!(path, dir.path().join("b.dcm"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_collect_into_keeps_partial_state_on_conflict() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(
            &dir.path().join("a.dcm"),
            &[("patient", "P1"), ("series", "S1"), ("instance", "I1"), ("modality", "CT")],
        );
        write_dataset(
            &dir.path().join("b.dcm"),
            &[("patient", "P1"), ("series", "S1"), ("instance", "I2"), ("modality", "MR")],
        );

        let mut store = PatientStore::new();
        let mut report = ScanReport::new(dir.path());
        assert!(collector("*")
            .collect_into(dir.path(), &mut store, &mut report)
            .is_err());
        assert_eq!(store.instance_count(), 1);
    }

    #[test]
    fn test_unrecognized_and_incomplete_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        write_dataset(&dir.path().join("partial.dcm"), &[("patient", "P1"), ("modality", "CT")]);
        write_dataset(
            &dir.path().join("good.dcm"),
            &[("patient", "P1"), ("series", "S1"), ("instance", "I1"), ("modality", "CT")],
        );

        let outcome = collector("*").collect(dir.path()).unwrap();
        assert_eq!(outcome.store.instance_count(), 1);
        assert_eq!(outcome.report.unrecognized_files, 1);
        assert_eq!(outcome.report.incomplete_files, 1);
        assert_eq!(outcome.report.skipped_files(), 2);
    }

    #[test]
    fn test_pattern_and_recursion() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(
            &dir.path().join("root.dcm"),
            &[("patient", "P1"), ("series", "S1"), ("instance", "I1"), ("modality", "CT")],
        );
        write_dataset(
            &dir.path().join("nested/deeper/plan.dcm"),
            &[("patient", "P2"), ("series", "S2"), ("instance", "I2"), ("modality", "RTPLAN")],
        );
        write_dataset(
            &dir.path().join("nested/ignored.txt"),
            &[("patient", "P3"), ("series", "S3"), ("instance", "I3"), ("modality", "CT")],
        );

        let outcome = collector("*.dcm").collect(dir.path()).unwrap();
        assert_eq!(outcome.store.count(), 2);
        assert!(outcome.store.try_get("P3").is_none());
        assert_eq!(outcome.report.directories_scanned, 3);
        assert_eq!(outcome.report.files_matched, 2);
        assert_eq!(
            outcome.store.find_by_modality_type(ModalityType::Plan).len(),
            1
        );
    }

    #[test]
    fn test_files_before_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let fields = [("patient", "P1"), ("series", "S1"), ("instance", "I1"), ("modality", "CT")];
        write_dataset(&dir.path().join("a_sub/first.dcm"), &fields);
        write_dataset(&dir.path().join("z.dcm"), &fields);

        let outcome = collector("*").collect(dir.path()).unwrap();
        let instance = outcome.store.try_get_instance("P1", "S1", "I1").unwrap();
        assert_eq!(instance.file_path, dir.path().join("z.dcm"));
    }

    #[test]
    fn test_machine_mapping_and_label() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(
            &dir.path().join("plan.dcm"),
            &[
                ("patient", "P1"),
                ("series", "S1"),
                ("instance", "I1"),
                ("modality", "RTPLAN"),
                ("label", "Prostate"),
                ("machine", "UNKNOWN"),
                ("model", "TrueBeam"),
            ],
        );

        let machines = MachineMapping::new(
            BTreeMap::new(),
            BTreeMap::from([("TrueBeam".to_string(), "TB-1".to_string())]),
        );
        let outcome = Collector::new(KeyValueReader, machines, "*")
            .unwrap()
            .collect(dir.path())
            .unwrap();

        let instance = outcome.store.try_get_instance("P1", "S1", "I1").unwrap();
        assert_eq!(instance.label, "Prostate");
        assert_eq!(instance.machine.as_deref(), Some("TB-1"));
    }

    #[test]
    fn test_cancellation_aborts() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(
            &dir.path().join("a.dcm"),
            &[("patient", "P1"), ("series", "S1"), ("instance", "I1"), ("modality", "CT")],
        );

        let token = CancellationToken::new();
        token.cancel();
        let err = collector("*")
            .with_cancellation(token)
            .collect(dir.path())
            .unwrap_err();
        assert!(matches!(err, IndexError::Cancelled));
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = collector("*").collect(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, IndexError::Io { .. }));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Collector::new(KeyValueReader, MachineMapping::default(), "[").unwrap_err();
        assert!(matches!(err, IndexError::InvalidPattern(_)));
    }

    #[test]
    fn test_case_insensitive_matching() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(
            &dir.path().join("UPPER.DCM"),
            &[("patient", "P1"), ("series", "S1"), ("instance", "I1"), ("modality", "CT")],
        );

        let strict = collector("*.dcm").collect(dir.path()).unwrap();
        assert_eq!(strict.store.instance_count(), 0);

        let relaxed = collector("*.dcm")
            .case_sensitive(false)
            .collect(dir.path())
            .unwrap();
        assert_eq!(relaxed.store.instance_count(), 1);
    }
}
