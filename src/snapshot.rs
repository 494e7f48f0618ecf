use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::paths::{ensure_parent_dir, scoped_path};
use crate::timer::Millis;

/// A request to download the current frame of a camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRequest {
    pub entity: String,
    pub url: String,
    pub file_name: String,
    pub requested_at: Millis,
}

impl SnapshotRequest {
    #[must_use]
    pub fn new(entity: &str, name: &str, url: &str, now: Millis) -> Self {
        Self {
            entity: entity.to_owned(),
            url: url.to_owned(),
            file_name: snapshot_file_name(name, now),
            requested_at: now,
        }
    }
}

#[must_use]
pub fn snapshot_file_name(name: &str, at: Millis) -> String {
    format!("{}_{}.jpg", name.replace(' ', "_"), iso_timestamp(at))
}

#[must_use]
pub fn iso_timestamp(at: Millis) -> String {
    let at = i64::try_from(at).unwrap_or(i64::MAX);
    DateTime::<Utc>::from_timestamp_millis(at)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn manifest_path() -> Result<PathBuf> {
    scoped_path("snapshots.jsonl")
}

/// Appends one request per line to the snapshot manifest.
pub fn append_snapshot(path: &Path, request: &SnapshotRequest) -> Result<()> {
    ensure_parent_dir(path)?;
    let line = serde_json::to_string(request).context("failed serializing snapshot request")?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed opening snapshot manifest at {}", path.display()))?;
    writeln!(file, "{line}")
        .with_context(|| format!("failed writing snapshot manifest at {}", path.display()))?;
    Ok(())
}

pub fn load_snapshots(path: &Path) -> Result<Vec<SnapshotRequest>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading snapshot manifest at {}", path.display()))?;
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(idx, line)| {
            serde_json::from_str::<SnapshotRequest>(line).with_context(|| {
                format!(
                    "failed parsing line {} of snapshot manifest at {}",
                    idx + 1,
                    path.display()
                )
            })
        })
        .collect()
}
