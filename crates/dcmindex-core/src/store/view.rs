//! 只读视图
//!
//! 视图包装对存储的共享引用，只暴露查询操作，交给展示、传输等下游使用。

use super::instance::InstanceStore;
use super::patient::PatientStore;
use super::series::{Series, SeriesStore};
use crate::models::{Instance, Modality, ModalityType};

/// 单个患者系列集合的只读视图
#[derive(Debug, Clone, Copy)]
pub struct SeriesStoreView<'a> {
    store: &'a SeriesStore,
}

impl<'a> SeriesStoreView<'a> {
    pub fn new(store: &'a SeriesStore) -> Self {
        Self { store }
    }

    pub fn try_get_series(&self, series_uid: &str) -> Option<(&'a Modality, &'a InstanceStore)> {
        self.store.try_get_series(series_uid)
    }

    pub fn find_by_modality_type(&self, modality_type: ModalityType) -> Vec<&'a Series> {
        self.store.find_by_modality_type(modality_type)
    }

    pub fn find_instances<F>(&self, modality_type: ModalityType, predicate: F) -> Vec<&'a Instance>
    where
        F: Fn(&Instance) -> bool,
    {
        self.store.find_instances(modality_type, predicate)
    }

    pub fn series(&self) -> impl Iterator<Item = &'a Series> + 'a {
        self.store.iter()
    }

    pub fn count(&self) -> usize {
        self.store.count()
    }

    pub fn instance_count(&self) -> usize {
        self.store.instance_count()
    }
}

/// 患者索引的只读视图
#[derive(Debug, Clone, Copy)]
pub struct PatientStoreView<'a> {
    store: &'a PatientStore,
}

impl<'a> PatientStoreView<'a> {
    pub fn new(store: &'a PatientStore) -> Self {
        Self { store }
    }

    pub fn try_get(&self, patient_id: &str) -> Option<SeriesStoreView<'a>> {
        self.store.try_get(patient_id).map(SeriesStoreView::new)
    }

    pub fn patients(&self) -> impl Iterator<Item = (&'a str, SeriesStoreView<'a>)> + 'a {
        self.store
            .iter()
            .map(|(patient_id, series)| (patient_id.as_str(), SeriesStoreView::new(series)))
    }

    pub fn find_by_modality_type(&self, modality_type: ModalityType) -> Vec<(&'a str, &'a Series)> {
        self.store.find_by_modality_type(modality_type)
    }

    pub fn count(&self) -> usize {
        self.store.count()
    }

    pub fn series_count(&self) -> usize {
        self.store.series_count()
    }

    pub fn instance_count(&self) -> usize {
        self.store.instance_count()
    }
}
