use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Priority of a group whose persisted priority is missing or unreadable.
pub const DEFAULT_PRIORITY: f64 = 0.0;

const PAIR_SEPARATOR: char = ',';
const KEY_VALUE_SEPARATOR: char = '=';

/// A usage group. Groups are identified by id alone; the priority only
/// decides where the group is written.
#[derive(Debug, Clone)]
pub struct GroupDescriptor {
    id: String,
    priority: f64,
}

impl GroupDescriptor {
    pub fn new(id: impl Into<String>, priority: f64) -> Self {
        Self {
            id: id.into(),
            priority,
        }
    }

    pub fn with_default_priority(id: impl Into<String>) -> Self {
        Self::new(id, DEFAULT_PRIORITY)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }
}

impl PartialEq for GroupDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GroupDescriptor {}

/// Higher priority first, then id.
pub(crate) fn by_priority(a: &GroupDescriptor, b: &GroupDescriptor) -> Ordering {
    b.priority
        .total_cmp(&a.priority)
        .then_with(|| a.id.cmp(&b.id))
}

/// One counted usage within a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsageDescriptor {
    key: String,
    value: i64,
}

impl UsageDescriptor {
    /// Characters that would break the value string are replaced in `key`.
    pub fn new(key: &str, value: i64) -> Self {
        Self {
            key: proper_key(key),
            value,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

fn proper_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            PAIR_SEPARATOR | KEY_VALUE_SEPARATOR | ';' | ':' => '_',
            c => c,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueStringError {
    #[error("usage `{0}` has no `=`")]
    MissingSeparator(String),
    #[error("usage `{0}` has an empty key")]
    EmptyKey(String),
    #[error("usage `{key}` has a non-numeric count `{value}`")]
    InvalidCount { key: String, value: String },
}

/// Parses `key=value,key=value`. Blank pairs are ignored; counts for a
/// repeated key are summed.
pub fn parse_value_string(data: &str) -> Result<BTreeMap<String, i64>, ValueStringError> {
    let mut usages = BTreeMap::new();
    for pair in data.split(PAIR_SEPARATOR).map(str::trim).filter(|pair| !pair.is_empty()) {
        let (key, value) = pair
            .split_once(KEY_VALUE_SEPARATOR)
            .ok_or_else(|| ValueStringError::MissingSeparator(pair.to_owned()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ValueStringError::EmptyKey(pair.to_owned()));
        }
        let value = value.trim();
        let count: i64 = value.parse().map_err(|_| ValueStringError::InvalidCount {
            key: key.to_owned(),
            value: value.to_owned(),
        })?;
        *usages.entry(key.to_owned()).or_insert(0) += count;
    }
    Ok(usages)
}

/// Inverse of [`parse_value_string`], keys in sorted order.
pub fn to_value_string(usages: &BTreeMap<String, i64>) -> String {
    usages
        .iter()
        .map(|(key, value)| format!("{key}{KEY_VALUE_SEPARATOR}{value}"))
        .collect::<Vec<_>>()
        .join(",")
}
