//! Prediction storage.
//!
//! Predictions are written once and later annotated with the actual
//! settlement price. [`JsonFileStore`] keeps one pretty-printed JSON file per
//! contract and settlement date; [`InMemoryStore`] backs tests and one-shot
//! runs.

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use settlement_core::SettlementPrediction;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Identifies one stored prediction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PredictionKey {
    pub contract_code: String,
    pub settlement_date: Option<NaiveDate>,
}

impl PredictionKey {
    #[must_use]
    pub fn new(contract_code: impl Into<String>, settlement_date: Option<NaiveDate>) -> Self {
        Self {
            contract_code: contract_code.into(),
            settlement_date,
        }
    }

    /// File-name friendly form, e.g. `202601W3_2026-01-14`.
    #[must_use]
    pub fn file_stem(&self) -> String {
        let code: String = self
            .contract_code
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        match self.settlement_date {
            Some(date) => format!("{code}_{}", date.format("%Y-%m-%d")),
            None => format!("{code}_undated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub key: PredictionKey,
    pub prediction: SettlementPrediction,
    /// Filled in once the contract has settled
    #[serde(default)]
    pub actual_settlement: Option<f64>,
    pub saved_at: DateTime<Utc>,
}

impl PredictionRecord {
    #[must_use]
    pub fn new(prediction: SettlementPrediction) -> Self {
        Self {
            key: PredictionKey::new(prediction.contract_code.clone(), prediction.settlement_date),
            prediction,
            actual_settlement: None,
            saved_at: Utc::now(),
        }
    }

    /// Records the settlement price.
    #[must_use]
    pub fn with_actual(mut self, actual: f64) -> Self {
        self.actual_settlement = Some(actual);
        self.saved_at = Utc::now();
        self
    }
}

/// Keyed prediction repository.
pub trait PredictionStore: Send + Sync {
    /// Inserts or replaces the record under its key.
    ///
    /// # Errors
    /// Returns an error if the record cannot be persisted.
    fn save(&self, record: &PredictionRecord) -> Result<(), StoreError>;

    /// Returns the record for `key`, or `None` when absent.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn load(&self, key: &PredictionKey) -> Result<Option<PredictionRecord>, StoreError>;

    /// Returns every record ordered by key.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be listed.
    fn list(&self) -> Result<Vec<PredictionRecord>, StoreError>;
}

/// One JSON file per prediction under a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &PredictionKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.file_stem()))
    }

    /// Reads one file. Missing files and unparseable content yield `None`.
    fn read_record(path: &Path) -> Result<Option<PredictionRecord>, StoreError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_reader(BufReader::new(file)) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse stored prediction, ignoring"
                );
                Ok(None)
            }
        }
    }
}

impl PredictionStore for JsonFileStore {
    fn save(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }

        let path = self.path_for(&record.key);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, record)?;

        debug!(
            path = %path.display(),
            contract = %record.key.contract_code,
            has_actual = record.actual_settlement.is_some(),
            "Saved prediction"
        );
        Ok(())
    }

    fn load(&self, key: &PredictionKey) -> Result<Option<PredictionRecord>, StoreError> {
        Self::read_record(&self.path_for(key))
    }

    fn list(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(record) = Self::read_record(&path)? {
                records.push(record);
            }
        }
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<BTreeMap<PredictionKey, PredictionRecord>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl PredictionStore for InMemoryStore {
    fn save(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        self.records.write().insert(record.key.clone(), record.clone());
        Ok(())
    }

    fn load(&self, key: &PredictionKey) -> Result<Option<PredictionRecord>, StoreError> {
        Ok(self.records.read().get(key).cloned())
    }

    fn list(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        Ok(self.records.read().values().cloned().collect())
    }
}
