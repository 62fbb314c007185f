//! 实例存储：单个系列内按实例UID索引的实例集合

use std::collections::btree_map::{self, Entry};
use std::collections::BTreeMap;

use crate::error::{IndexError, Result};
use crate::models::Instance;

/// 单个系列内的实例集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceStore {
    instances: BTreeMap<String, Instance>, // instance_uid -> instance
}

impl InstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_get(&self, instance_uid: &str) -> Option<&Instance> {
        self.instances.get(instance_uid)
    }

    pub fn contains(&self, instance_uid: &str) -> bool {
        self.instances.contains_key(instance_uid)
    }

    /// 插入实例；UID已存在时返回 [`IndexError::DuplicateInstance`]，存储保持不变
    pub fn add(&mut self, instance: Instance) -> Result<()> {
        match self.instances.entry(instance.instance_uid.clone()) {
            Entry::Occupied(existing) => Err(IndexError::DuplicateInstance {
                instance_uid: instance.instance_uid,
                existing: existing.get().file_path.clone(),
                rejected: instance.file_path,
            }),
            Entry::Vacant(slot) => {
                slot.insert(instance);
                Ok(())
            }
        }
    }

    pub fn remove(&mut self, instance_uid: &str) -> Option<Instance> {
        self.instances.remove(instance_uid)
    }

    pub fn count(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> btree_map::Values<'_, String, Instance> {
        self.instances.values()
    }

    /// 移除所有满足条件的实例并返回
    pub(crate) fn extract_matching<F>(&mut self, mut predicate: F) -> Vec<Instance>
    where
        F: FnMut(&Instance) -> bool,
    {
        let matched: Vec<String> = self
            .instances
            .values()
            .filter(|instance| predicate(*instance))
            .map(|instance| instance.instance_uid.clone())
            .collect();

        matched
            .iter()
            .filter_map(|uid| self.instances.remove(uid))
            .collect()
    }
}

impl<'a> IntoIterator for &'a InstanceStore {
    type Item = &'a Instance;
    type IntoIter = btree_map::Values<'a, String, Instance>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for InstanceStore {
    type Item = Instance;
    type IntoIter = btree_map::IntoValues<String, Instance>;

    fn into_iter(self) -> Self::IntoIter {
        self.instances.into_values()
    }
}
