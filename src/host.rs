use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

pub const MOTION_ON: &str = "on";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateAttributes {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub entity_picture: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// State object as supplied by the host for one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateObject {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub attributes: StateAttributes,
}

#[derive(Debug, Clone, Deserialize)]
struct StateListEntry {
    entity_id: String,
    #[serde(flatten)]
    object: StateObject,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StateFile {
    Map(HashMap<String, StateObject>),
    List(Vec<StateListEntry>),
}

/// Read-only snapshot of the host's entity states.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostStates {
    states: HashMap<String, StateObject>,
}

impl HostStates {
    #[must_use]
    pub fn new(states: HashMap<String, StateObject>) -> Self {
        Self { states }
    }

    #[must_use]
    pub fn get(&self, entity: &str) -> Option<&StateObject> {
        self.states.get(entity)
    }

    #[must_use]
    pub fn is_on(&self, entity: &str) -> bool {
        self.get(entity)
            .is_some_and(|object| object.state == MOTION_ON)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn insert(&mut self, entity: impl Into<String>, object: StateObject) {
        self.states.insert(entity.into(), object);
    }
}

pub fn parse_states(raw: &str) -> Result<HostStates> {
    let parsed = serde_json::from_str::<StateFile>(raw).context("failed parsing host states")?;
    let states = match parsed {
        StateFile::Map(states) => states,
        StateFile::List(entries) => entries
            .into_iter()
            .map(|entry| (entry.entity_id, entry.object))
            .collect(),
    };
    Ok(HostStates::new(states))
}

pub fn load_states(path: &Path) -> Result<HostStates> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading host states at {}", path.display()))?;
    parse_states(&raw).with_context(|| format!("invalid host states at {}", path.display()))
}

#[derive(Debug, Default)]
struct FeedSnapshot {
    seq: u64,
    states: Arc<HostStates>,
    error: Option<String>,
}

/// Latest host states published by the watcher task.
#[derive(Debug, Default)]
pub struct HostStateFeed {
    inner: RwLock<FeedSnapshot>,
}

impl HostStateFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, states: HostStates) {
        let mut snapshot = self.inner.write();
        snapshot.seq = snapshot.seq.saturating_add(1);
        snapshot.states = Arc::new(states);
        snapshot.error = None;
    }

    pub fn set_error(&self, error: impl Into<String>) {
        self.inner.write().error = Some(error.into());
    }

    /// Returns the states if they are newer than `seen_seq`.
    #[must_use]
    pub fn take_newer(&self, seen_seq: u64) -> Option<(u64, Arc<HostStates>)> {
        let snapshot = self.inner.read();
        (snapshot.seq > seen_seq).then(|| (snapshot.seq, snapshot.states.clone()))
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.inner.read().error.clone()
    }
}

/// Polls the state file and republishes it whenever its mtime changes.
pub async fn run_state_file_watcher(path: PathBuf, poll: Duration, feed: Arc<HostStateFeed>) {
    let mut last_modified: Option<SystemTime> = None;
    loop {
        reload_if_modified(&path, &mut last_modified, &feed);
        tokio::time::sleep(poll).await;
    }
}

/// Re-reads the state file when its mtime differs from `last_modified`.
/// Returns `true` if a read was attempted. A file that fails to parse is
/// not re-read until it is written again.
fn reload_if_modified(
    path: &Path,
    last_modified: &mut Option<SystemTime>,
    feed: &HostStateFeed,
) -> bool {
    let modified = match fs::metadata(path).and_then(|meta| meta.modified()) {
        Ok(modified) => modified,
        Err(err) => {
            log::warn!("failed to stat host states at {}: {err}", path.display());
            feed.set_error(format!("host states unavailable: {err}"));
            return false;
        }
    };
    if *last_modified == Some(modified) {
        return false;
    }
    *last_modified = Some(modified);

    match load_states(path) {
        Ok(states) => {
            log::debug!(
                "loaded {} host state object(s) from {}",
                states.len(),
                path.display()
            );
            feed.publish(states);
        }
        Err(err) => {
            // The last good snapshot stays published.
            log::warn!("{err:#}");
            feed.set_error(format!("{err:#}"));
        }
    }
    true
}
