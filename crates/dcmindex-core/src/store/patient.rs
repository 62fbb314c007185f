//! 患者存储：顶层索引 PatientId -> 系列集合

use std::collections::btree_map::{self, Entry};
use std::collections::BTreeMap;

use tracing::debug;

use super::series::{Series, SeriesStore};
use super::view::PatientStoreView;
use crate::error::{IndexError, Result};
use crate::models::{Instance, ModalityType};

/// 全部患者的索引（扫描结果的根对象）
///
/// 患者在第一次插入实例时创建。系列被移除后患者不会自动删除，
/// 需要时调用 [`PatientStore::remove_empty_patients`]。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientStore {
    patients: BTreeMap<String, SeriesStore>, // patient_id -> series store
}

impl PatientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按实例的患者ID插入，错误原样向上传递；失败时不会留下新建的空患者
    pub fn add(&mut self, instance: Instance) -> Result<()> {
        match self.patients.entry(instance.patient_id.clone()) {
            Entry::Occupied(mut patient) => patient.get_mut().add(instance),
            Entry::Vacant(slot) => {
                let mut series_store = SeriesStore::new();
                series_store.add(instance)?;
                debug!("创建患者: {}", slot.key());
                slot.insert(series_store);
                Ok(())
            }
        }
    }

    pub fn try_get(&self, patient_id: &str) -> Option<&SeriesStore> {
        self.patients.get(patient_id)
    }

    /// 向指定患者插入实例
    ///
    /// 实例的患者ID必须与 `patient_id` 一致，否则返回 [`IndexError::UnsupportedArgument`]。
    pub fn add_to_patient(&mut self, patient_id: &str, instance: Instance) -> Result<()> {
        if instance.patient_id != patient_id {
            return Err(IndexError::UnsupportedArgument(format!(
                "实例 {} 属于患者 {}，不能加入患者 {}",
                instance.instance_uid, instance.patient_id, patient_id
            )));
        }
        self.add(instance)
    }

    /// 在指定患者中查找并移除满足条件的实例；患者本身保留
    pub fn find_and_remove_instances<F>(
        &mut self,
        patient_id: &str,
        modality_type: ModalityType,
        predicate: F,
    ) -> Vec<Instance>
    where
        F: FnMut(&Instance) -> bool,
    {
        self.patients
            .get_mut(patient_id)
            .map(|patient| patient.find_and_remove_instances(modality_type, predicate))
            .unwrap_or_default()
    }

    /// 从指定患者中批量移除实例，返回实际移除的数量
    pub fn remove_instances<'a, I>(&mut self, patient_id: &str, instances: I) -> usize
    where
        I: IntoIterator<Item = &'a Instance>,
    {
        self.patients
            .get_mut(patient_id)
            .map_or(0, |patient| patient.remove_instances(instances))
    }

    pub fn try_get_instance(
        &self,
        patient_id: &str,
        series_uid: &str,
        instance_uid: &str,
    ) -> Option<&Instance> {
        self.patients
            .get(patient_id)
            .and_then(|patient| patient.try_get_instance(series_uid, instance_uid))
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, SeriesStore> {
        self.patients.iter()
    }

    pub fn count(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    pub fn series_count(&self) -> usize {
        self.patients.values().map(SeriesStore::count).sum()
    }

    pub fn instance_count(&self) -> usize {
        self.patients.values().map(SeriesStore::instance_count).sum()
    }

    /// 跨患者查找指定模态类别的系列
    pub fn find_by_modality_type(&self, modality_type: ModalityType) -> Vec<(&str, &Series)> {
        self.patients
            .iter()
            .flat_map(|(patient_id, patient)| {
                patient
                    .find_by_modality_type(modality_type)
                    .into_iter()
                    .map(move |series| (patient_id.as_str(), series))
            })
            .collect()
    }

    /// 跨患者查找并移除指定模态类别的系列
    pub fn find_and_remove_by_modality_type(
        &mut self,
        modality_type: ModalityType,
    ) -> Vec<(String, Series)> {
        let mut claimed = Vec::new();
        for (patient_id, patient) in self.patients.iter_mut() {
            claimed.extend(
                patient
                    .find_and_remove_by_modality_type(modality_type)
                    .into_iter()
                    .map(|series| (patient_id.clone(), series)),
            );
        }
        claimed
    }

    pub fn remove_patient(&mut self, patient_id: &str) -> Option<SeriesStore> {
        self.patients.remove(patient_id)
    }

    /// 移除没有任何系列的患者，返回被移除的患者ID
    pub fn remove_empty_patients(&mut self) -> Vec<String> {
        let empty: Vec<String> = self
            .patients
            .iter()
            .filter(|(_, patient)| patient.is_empty())
            .map(|(patient_id, _)| patient_id.clone())
            .collect();

        for patient_id in &empty {
            self.patients.remove(patient_id);
        }
        empty
    }

    pub fn view(&self) -> PatientStoreView<'_> {
        PatientStoreView::new(self)
    }
}

impl<'a> IntoIterator for &'a PatientStore {
    type Item = (&'a String, &'a SeriesStore);
    type IntoIter = btree_map::Iter<'a, String, SeriesStore>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
