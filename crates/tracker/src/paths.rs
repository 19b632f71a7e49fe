// crates/tracker/src/paths.rs
//! Centralized path functions for client-local state.

use std::path::PathBuf;

/// State root: `$QPEPTIDE_STATE_DIR` if set, else
/// `~/.local/share/qpeptide/` (Linux) or the platform equivalent.
pub fn state_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("QPEPTIDE_STATE_DIR") {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir));
        }
    }
    dirs::data_local_dir().map(|d| d.join("qpeptide"))
}

/// Tracked-digest record: `<state_dir>/digest-state.json`.
pub fn digest_state_path() -> Option<PathBuf> {
    state_dir().map(|d| d.join("digest-state.json"))
}

/// Saved submission draft: `<state_dir>/digest-draft.json`.
pub fn draft_path() -> Option<PathBuf> {
    state_dir().map(|d| d.join("digest-draft.json"))
}
