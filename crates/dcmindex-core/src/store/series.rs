//! 系列存储：单个患者内按系列UID索引的系列集合
//!
//! 每个系列只允许一种模态。系列在第一次插入实例时创建，
//! 在删除操作使其实例数归零时被移除。

use std::collections::btree_map;
use std::collections::BTreeMap;

use tracing::debug;

use super::instance::InstanceStore;
use super::view::SeriesStoreView;
use crate::error::{IndexError, Result};
use crate::models::{Instance, Modality, ModalityType};

/// 系列：同一模态的实例集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    series_uid: String,
    modality: Modality,
    instances: InstanceStore,
}

impl Series {
    pub fn new(series_uid: impl Into<String>, modality: Modality) -> Self {
        Self {
            series_uid: series_uid.into(),
            modality,
            instances: InstanceStore::new(),
        }
    }

    pub fn series_uid(&self) -> &str {
        &self.series_uid
    }

    pub fn modality(&self) -> &Modality {
        &self.modality
    }

    pub fn instances(&self) -> &InstanceStore {
        &self.instances
    }

    pub fn count(&self) -> usize {
        self.instances.count()
    }

    /// 直接向系列添加实例
    ///
    /// 实例必须属于本系列且模态相同，否则返回 [`IndexError::UnsupportedArgument`]。
    pub fn add(&mut self, instance: Instance) -> Result<()> {
        if instance.series_uid != self.series_uid {
            return Err(IndexError::UnsupportedArgument(format!(
                "实例 {} 属于系列 {}，不能加入系列 {}",
                instance.instance_uid, instance.series_uid, self.series_uid
            )));
        }
        if instance.modality != self.modality {
            return Err(IndexError::UnsupportedArgument(format!(
                "实例 {} 的模态 {} 与系列 {} 的模态 {} 不一致",
                instance.instance_uid, instance.modality, self.series_uid, self.modality
            )));
        }
        self.instances.add(instance)
    }

    pub fn remove(&mut self, instance_uid: &str) -> Option<Instance> {
        self.instances.remove(instance_uid)
    }

    pub fn into_instances(self) -> InstanceStore {
        self.instances
    }
}

/// 单个患者的系列集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesStore {
    series: BTreeMap<String, Series>, // series_uid -> series
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入实例，必要时创建新系列
    ///
    /// 已有系列的模态与实例不一致时返回 [`IndexError::ModalityMismatch`]；
    /// 重复的实例UID返回 [`IndexError::DuplicateInstance`]。失败时存储保持不变。
    pub fn add(&mut self, instance: Instance) -> Result<()> {
        if let Some(series) = self.series.get_mut(&instance.series_uid) {
            if series.modality != instance.modality {
                return Err(IndexError::ModalityMismatch {
                    series_uid: instance.series_uid,
                    expected: series.modality.code().to_string(),
                    found: instance.modality.code().to_string(),
                    path: instance.file_path,
                });
            }
            return series.instances.add(instance);
        }

        let series_uid = instance.series_uid.clone();
        let mut series = Series::new(series_uid.clone(), instance.modality.clone());
        series.instances.add(instance)?;
        debug!("创建系列: {} ({})", series_uid, series.modality);
        self.series.insert(series_uid, series);
        Ok(())
    }

    pub fn get(&self, series_uid: &str) -> Option<&Series> {
        self.series.get(series_uid)
    }

    pub fn try_get_series(&self, series_uid: &str) -> Option<(&Modality, &InstanceStore)> {
        self.series
            .get(series_uid)
            .map(|series| (&series.modality, &series.instances))
    }

    pub fn try_get_instance(&self, series_uid: &str, instance_uid: &str) -> Option<&Instance> {
        self.series
            .get(series_uid)
            .and_then(|series| series.instances.try_get(instance_uid))
    }

    /// 查找指定模态类别的所有系列（按系列UID排序）
    pub fn find_by_modality_type(&self, modality_type: ModalityType) -> Vec<&Series> {
        self.series
            .values()
            .filter(|series| series.modality.modality_type() == modality_type)
            .collect()
    }

    /// 查找并移除指定模态类别的所有系列
    pub fn find_and_remove_by_modality_type(&mut self, modality_type: ModalityType) -> Vec<Series> {
        let matched: Vec<String> = self
            .find_by_modality_type(modality_type)
            .into_iter()
            .map(|series| series.series_uid.clone())
            .collect();

        matched
            .iter()
            .filter_map(|series_uid| self.series.remove(series_uid))
            .collect()
    }

    /// 在指定模态类别的系列中查找满足条件的实例
    pub fn find_instances<F>(&self, modality_type: ModalityType, predicate: F) -> Vec<&Instance>
    where
        F: Fn(&Instance) -> bool,
    {
        self.find_by_modality_type(modality_type)
            .into_iter()
            .flat_map(|series| series.instances.iter())
            .filter(|instance| predicate(*instance))
            .collect()
    }

    /// 查找并移除满足条件的实例；实例被全部移除的系列也会被移除
    pub fn find_and_remove_instances<F>(
        &mut self,
        modality_type: ModalityType,
        mut predicate: F,
    ) -> Vec<Instance>
    where
        F: FnMut(&Instance) -> bool,
    {
        let mut removed = Vec::new();
        for series in self
            .series
            .values_mut()
            .filter(|series| series.modality.modality_type() == modality_type)
        {
            removed.extend(series.instances.extract_matching(&mut predicate));
        }

        self.remove_empty_series();
        removed
    }

    /// 按 (系列UID, 实例UID) 批量移除实例，返回实际移除的数量
    pub fn remove_instances<'a, I>(&mut self, instances: I) -> usize
    where
        I: IntoIterator<Item = &'a Instance>,
    {
        let mut removed = 0;
        for instance in instances {
            if let Some(series) = self.series.get_mut(&instance.series_uid) {
                if series.instances.remove(&instance.instance_uid).is_some() {
                    removed += 1;
                }
            }
        }

        self.remove_empty_series();
        removed
    }

    /// 无条件移除整个系列
    pub fn remove(&mut self, series_uid: &str) -> Option<Series> {
        self.series.remove(series_uid)
    }

    pub fn count(&self) -> usize {
        self.series.len()
    }

    pub fn instance_count(&self) -> usize {
        self.series.values().map(Series::count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn iter(&self) -> btree_map::Values<'_, String, Series> {
        self.series.values()
    }

    pub fn view(&self) -> SeriesStoreView<'_> {
        SeriesStoreView::new(self)
    }

    fn remove_empty_series(&mut self) {
        self.series.retain(|series_uid, series| {
            let keep = !series.instances.is_empty();
            if !keep {
                debug!("系列 {} 已无实例，移除", series_uid);
            }
            keep
        });
    }
}

impl<'a> IntoIterator for &'a SeriesStore {
    type Item = &'a Series;
    type IntoIter = btree_map::Values<'a, String, Series>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
