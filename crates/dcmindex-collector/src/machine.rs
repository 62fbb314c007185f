//! 设备名称规范化

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 设备映射表
///
/// `machines` 把文件中的设备名映射为规范名称；
/// `default_by_model` 在设备名没有映射时按设备型号给出默认设备。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MachineMapping {
    #[serde(default)]
    pub machines: BTreeMap<String, String>,
    #[serde(default)]
    pub default_by_model: BTreeMap<String, String>,
}

impl MachineMapping {
    pub fn new(
        machines: BTreeMap<String, String>,
        default_by_model: BTreeMap<String, String>,
    ) -> Self {
        Self {
            machines,
            default_by_model,
        }
    }

    /// 规范化设备名：设备映射 > 型号默认设备 > 原始设备名
    pub fn normalize(&self, machine: Option<&str>, model: Option<&str>) -> Option<String> {
        let machine = machine.map(str::trim).filter(|m| !m.is_empty());
        let model = model.map(str::trim).filter(|m| !m.is_empty());

        machine
            .and_then(|m| lookup(&self.machines, m))
            .or_else(|| model.and_then(|m| lookup(&self.default_by_model, m)))
            .cloned()
            .or_else(|| machine.map(str::to_string))
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty() && self.default_by_model.is_empty()
    }
}

/// 键比较不区分大小写
fn lookup<'a>(table: &'a BTreeMap<String, String>, key: &str) -> Option<&'a String> {
    table
        .get(key)
        .or_else(|| {
            table
                .iter()
                .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
                .map(|(_, value)| value)
        })
}
