// crates/tracker/src/store.rs
//! Durable single-record stores for tracked-digest state and the
//! submission draft.
//!
//! Both stores hold exactly one JSON record in a well-known file. A missing
//! or malformed file reads as "no record"; write failures are logged and
//! swallowed so storage trouble never takes the tracker down.

use std::path::PathBuf;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::warn;

/// Minimal durable snapshot of the digest currently being tracked.
///
/// Exists if and only if a digest is tracked; `status` is the client phase
/// at the time of the last transition. The record is allowed to outlive
/// `completed` until an explicit reset so a restarted client can still show
/// the finished digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedDigest {
    pub digest_id: String,
    pub status: String,
}

/// Saved submission form contents, so a half-written digest survives a
/// restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestDraft {
    pub protein_name: String,
    pub sequence: String,
}

fn read_record<T: DeserializeOwned>(path: &PathBuf) -> Option<T> {
    let bytes = std::fs::read(path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "discarding malformed state file");
            None
        }
    }
}

fn write_record<T: Serialize>(path: &PathBuf, record: &T) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!(path = %parent.display(), error = %e, "cannot create state dir");
            return;
        }
    }
    match serde_json::to_vec(record) {
        Ok(json) => {
            if let Err(e) = std::fs::write(path, json) {
                warn!(path = %path.display(), error = %e, "state write failed");
            }
        }
        Err(e) => warn!(error = %e, "state serialize failed"),
    }
}

fn remove_record(path: &PathBuf) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "state remove failed");
        }
    }
}

/// Store for the single [`TrackedDigest`] record.
#[derive(Debug, Clone)]
pub struct TrackedDigestStore {
    path: PathBuf,
}

impl TrackedDigestStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the default platform location; `None` when no home
    /// directory can be resolved.
    pub fn open_default() -> Option<Self> {
        crate::paths::digest_state_path().map(Self::new)
    }

    pub fn load(&self) -> Option<TrackedDigest> {
        read_record(&self.path)
    }

    pub fn save(&self, record: &TrackedDigest) {
        write_record(&self.path, record);
    }

    pub fn clear(&self) {
        remove_record(&self.path);
    }
}

/// Store for the single [`DigestDraft`] record.
#[derive(Debug, Clone)]
pub struct DraftStore {
    path: PathBuf,
}

impl DraftStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn open_default() -> Option<Self> {
        crate::paths::draft_path().map(Self::new)
    }

    pub fn load(&self) -> Option<DigestDraft> {
        read_record(&self.path)
    }

    pub fn save(&self, draft: &DigestDraft) {
        write_record(&self.path, draft);
    }

    pub fn clear(&self) {
        remove_record(&self.path);
    }
}
