use std::path::Path;

use anyhow::{bail, Context};
use pandora_types::{ContentHash, Item};
use serde_json::Value;

/// One input element, optionally identified by a key field.
///
/// Two records are the same item when both carry a key and the keys are
/// equal; otherwise the whole values must be equal. Content is always the
/// whole value, so a keyed record whose other fields differ shows up as a
/// change.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub value: Value,
    key: Option<Value>,
}

impl Record {
    pub fn new(value: Value, key_field: Option<&str>) -> Self {
        let key = key_field.and_then(|field| value.get(field).cloned());
        Self { value, key }
    }
}

impl ContentHash for Record {
    fn content_hash(&self) -> u64 {
        self.value.content_hash()
    }
}

impl Item for Record {
    fn is_same_item(&self, other: &Self) -> bool {
        match (&self.key, &other.key) {
            (Some(a), Some(b)) => a == b,
            _ => self.value == other.value,
        }
    }
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Load a flat list: a JSON array, or one string per line with `lines`.
pub fn load_records(path: &Path, lines: bool, key: Option<&str>) -> anyhow::Result<Vec<Record>> {
    let text = read(path)?;
    let values = if lines {
        text.lines().map(|l| Value::String(l.to_string())).collect()
    } else {
        match serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?
        {
            Value::Array(values) => values,
            other => bail!(
                "{}: expected a JSON array, found {}",
                path.display(),
                kind(&other)
            ),
        }
    };
    Ok(values.into_iter().map(|v| Record::new(v, key)).collect())
}

/// Load a JSON array of arrays, one inner array per group.
pub fn load_groups(path: &Path, key: Option<&str>) -> anyhow::Result<Vec<Vec<Record>>> {
    let text = read(path)?;
    let groups: Vec<Vec<Value>> = serde_json::from_str(&text)
        .with_context(|| format!("{}: expected a JSON array of arrays", path.display()))?;
    Ok(groups
        .into_iter()
        .map(|g| g.into_iter().map(|v| Record::new(v, key)).collect())
        .collect())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
