//! Tuning report: the final configuration plus per-stage winners.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use qtune_core::metrics::ClassificationReport;
use qtune_core::{Assignment, StageResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuneReport {
    /// Running configuration after the last stage.
    pub final_config: Assignment,
    pub stages: Vec<StageResult>,
    pub total_evaluations: usize,
    /// BLAKE3 digest of the ordered dataset.
    pub dataset_hash: String,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Per-class scores of the final configuration, when scored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ClassificationReport>,
}

impl TuneReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, json)
    }

    pub fn read_json(path: &Path) -> io::Result<Self> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}
