//! Trial history: JSONL append-only audit log.
//!
//! One JSON object per evaluated trial, written as the search runs. The log
//! records what happened; it is never read back to resume a search.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use qtune_core::{Assignment, RunningConfig, StageResult, Trial};

use crate::staging::TuneObserver;

/// A single history line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub stage_index: usize,
    pub stage: String,
    pub trial: usize,
    pub loss: f64,
    pub assignment: Assignment,
}

/// JSONL writer attached to a run as an observer.
///
/// Observer callbacks cannot fail, so the first write error is kept and
/// reported by [`finish`](Self::finish); later trials are not written.
pub struct TrialHistory {
    path: PathBuf,
    writer: BufWriter<File>,
    written: usize,
    error: Option<io::Error>,
}

impl TrialHistory {
    /// Create (or truncate) the history file.
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            written: 0,
            error: None,
        })
    }

    pub fn append(&mut self, entry: &HistoryEntry) -> io::Result<()> {
        let json = serde_json::to_string(entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.written += 1;
        Ok(())
    }

    /// Flush and return the number of lines written, or the first error.
    pub fn finish(mut self) -> io::Result<usize> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.writer.flush()?;
        Ok(self.written)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry from a history file. Malformed lines are skipped.
    pub fn read_all(path: &Path) -> io::Result<Vec<HistoryEntry>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = io::BufReader::new(File::open(path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(entry) = serde_json::from_str::<HistoryEntry>(&line) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

impl TuneObserver for TrialHistory {
    fn on_trial(&mut self, stage_index: usize, stage_name: &str, trial: &Trial) {
        if self.error.is_some() {
            return;
        }
        let entry = HistoryEntry {
            stage_index,
            stage: stage_name.to_string(),
            trial: trial.index,
            loss: trial.loss,
            assignment: trial.assignment.clone(),
        };
        if let Err(e) = self.append(&entry) {
            self.error = Some(e);
        }
    }

    fn on_stage_complete(&mut self, _result: &StageResult, _running: &RunningConfig) {
        if self.error.is_none() {
            if let Err(e) = self.writer.flush() {
                self.error = Some(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtune_core::ParamValue;

    fn trial(index: usize, loss: f64) -> Trial {
        Trial {
            index,
            assignment: [("max_depth".to_string(), ParamValue::Int(index as i64 + 3))]
                .into_iter()
                .collect(),
            loss,
        }
    }

    #[test]
    fn observer_writes_one_line_per_trial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trials.jsonl");

        let mut history = TrialHistory::create(&path).unwrap();
        history.on_trial(0, "tree_shape", &trial(0, -0.8));
        history.on_trial(0, "tree_shape", &trial(1, -0.9));
        assert_eq!(history.finish().unwrap(), 2);

        let entries = TrialHistory::read_all(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].trial, 1);
        assert_eq!(entries[1].loss, -0.9);
        assert_eq!(entries[1].assignment.get("max_depth"), Some(&ParamValue::Int(4)));
    }

    #[test]
    fn tuned_floats_read_back_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trials.jsonl");
        let gamma = 0.15642298102965355;
        let mut assignment = Assignment::new();
        assignment.insert("gamma", ParamValue::Float(gamma));

        let mut history = TrialHistory::create(&path).unwrap();
        history.on_trial(1, "split_penalty", &Trial { index: 0, assignment, loss: -0.7 });
        history.finish().unwrap();

        let entries = TrialHistory::read_all(&path).unwrap();
        assert_eq!(entries[0].assignment.get("gamma"), Some(&ParamValue::Float(gamma)));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trials.jsonl");
        let good = serde_json::to_string(&HistoryEntry {
            stage_index: 1,
            stage: "gamma".into(),
            trial: 0,
            loss: -0.5,
            assignment: Assignment::new(),
        })
        .unwrap();
        fs::write(&path, format!("{good}\nnot json\n\n{good}\n")).unwrap();
        assert_eq!(TrialHistory::read_all(&path).unwrap().len(), 2);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TrialHistory::read_all(&dir.path().join("none.jsonl"))
            .unwrap()
            .is_empty());
    }
}
