use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::EigenlakeError;

pub type Properties = Map<String, Value>;

/// Server behaviour when an inserted id already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnDuplicate {
    #[default]
    Error,
    Replace,
    Skip,
}

/// Whether a failure aborts the operation or is recorded and skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    #[default]
    Raise,
    Continue,
}

impl FromStr for OnError {
    type Err = EigenlakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raise" => Ok(OnError::Raise),
            "continue" => Ok(OnError::Continue),
            other => Err(EigenlakeError::Validation(format!(
                "on_error must be 'raise' or 'continue', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for OnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnError::Raise => f.write_str("raise"),
            OnError::Continue => f.write_str("continue"),
        }
    }
}

/// Server behaviour for filter keys that match nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnMissing {
    #[default]
    Skip,
    Error,
}

/// A record to insert; `id` is sent as `uuid` and omitted when absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    #[serde(rename = "uuid", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub properties: Properties,
    pub vector: Vec<f32>,
}

impl NewRecord {
    pub fn new(properties: Properties, vector: Vec<f32>) -> Self {
        Self {
            id: None,
            properties,
            vector,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A bare vector to attach to an existing or new id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorItem {
    #[serde(rename = "uuid", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub vector: Vec<f32>,
}

/// One record the service (or a failed flush) did not accept
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FailedRecord {
    #[serde(rename = "uuid", default, deserialize_with = "null_as_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub error: String,
}

impl FailedRecord {
    pub fn new(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            error: error.into(),
        }
    }
}

/// Accepted ids plus per-item failures of one bulk insert
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AddManyResult {
    #[serde(rename = "uuids", default, deserialize_with = "null_as_default")]
    pub ids: Vec<String>,
    #[serde(rename = "failed_objects", default, deserialize_with = "null_as_default")]
    pub failed_records: Vec<FailedRecord>,
}

impl AddManyResult {
    pub fn number_errors(&self) -> usize {
        self.failed_records.len()
    }
}

/// Options for a bulk insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddManyOptions {
    pub on_duplicate: OnDuplicate,
    pub on_error: OnError,
    pub batch_size: usize,
    pub max_workers: usize,
}

impl Default for AddManyOptions {
    fn default() -> Self {
        Self {
            on_duplicate: OnDuplicate::Error,
            on_error: OnError::Raise,
            batch_size: 500,
            max_workers: 1,
        }
    }
}

/// Index configuration as reported by the service
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub dims: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub schema: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub shards: Map<String, Value>,
}

/// One page of an offset-paginated object listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub objects: Vec<Value>,
    #[serde(default)]
    pub next_offset: Option<u64>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
