//! Numeric constant tables.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Constant name to value, as loaded for one architecture.
pub type ConstMap = HashMap<String, u64>;

/// A single named constant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConstValue {
    pub name: String,
    pub value: u64,
}

impl ConstValue {
    pub fn new(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Project a constant map into a list sorted by name.
pub fn sorted_consts(consts: &ConstMap) -> Vec<ConstValue> {
    let mut values: Vec<ConstValue> = consts
        .iter()
        .map(|(name, value)| ConstValue::new(name.clone(), *value))
        .collect();
    values.sort_by(|a, b| a.name.cmp(&b.name));
    values
}
