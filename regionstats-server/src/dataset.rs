//! Read-only telemetry dataset, loaded once at startup.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{DatasetConfig, DatasetPolicy};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dataset {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("dataset {path} is not a JSON array of records")]
    NotAnArray { path: PathBuf },
}

/// One telemetry observation, kept as the raw JSON object so that field aliases
/// can be resolved at aggregation time. Unknown fields are carried but never read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetryRecord {
    fields: Map<String, Value>,
}

impl TelemetryRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Raw value stored under `key`, if the record carries that key at all.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Immutable sequence of telemetry records. Cloning shares the underlying storage.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Arc<[TelemetryRecord]>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self::from_records(Vec::new())
    }
}

impl Dataset {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<TelemetryRecord>) -> Self {
        Self { records: records.into() }
    }

    /// Parse a JSON array of records. Array elements that are not objects are skipped.
    pub fn from_json_str(json: &str) -> Result<Self, DatasetError> {
        Self::parse(json, Path::new("<inline>"))
    }

    /// Read and parse the dataset file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::parse(&raw, path)?;
        info!(path = %path.display(), records = dataset.len(), "dataset loaded");
        Ok(dataset)
    }

    /// Load according to `config.policy`: propagate the error, or fall back to an empty dataset.
    pub fn load_with_policy(config: &DatasetConfig) -> Result<Self, DatasetError> {
        match Self::load(&config.path) {
            Ok(dataset) => Ok(dataset),
            Err(err) if config.policy == DatasetPolicy::EmptyOnError => {
                warn!(error = %err, "serving an empty dataset");
                Ok(Self::empty())
            }
            Err(err) => Err(err),
        }
    }

    fn parse(raw: &str, path: &Path) -> Result<Self, DatasetError> {
        let value: Value = serde_json::from_str(raw).map_err(|source| DatasetError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let Value::Array(items) = value else {
            return Err(DatasetError::NotAnArray { path: path.to_path_buf() });
        };

        let total = items.len();
        let records: Vec<TelemetryRecord> = items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(fields) => Some(TelemetryRecord::new(fields)),
                _ => None,
            })
            .collect();

        let skipped = total - records.len();
        if skipped > 0 {
            warn!(path = %path.display(), skipped, "skipped non-object dataset entries");
        }
        Ok(Self::from_records(records))
    }

    pub fn records(&self) -> &[TelemetryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
