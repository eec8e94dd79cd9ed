use std::fs;
use std::path::{Path, PathBuf};

use myo_core::{ErrorInfo, MyoError, RunProvenance, SchemaVersion};
use serde::{Deserialize, Serialize};

/// How the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Aborted,
}

/// Reproducibility record written next to the trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub provenance: RunProvenance,
    pub schema_version: SchemaVersion,
    pub half_sarcomeres: usize,
    /// Steps completed before the run ended.
    pub steps: u64,
    pub planned_steps: u64,
    pub status: RunStatus,
    pub error: Option<ErrorInfo>,
    pub trace_file: PathBuf,
    /// Canonical hash of each half-sarcomere's last snapshot.
    pub snapshot_hashes: Vec<String>,
}

impl RunManifest {
    pub fn write(&self, path: &Path) -> Result<(), MyoError> {
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            MyoError::Serde(
                ErrorInfo::new("manifest-serialize", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        fs::write(path, json).map_err(|err| {
            MyoError::Serde(
                ErrorInfo::new("manifest-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }
}
