// crates/tracker/src/lib.rs
//! Job-tracking core for the QPeptide client.
//!
//! One digest job is tracked at a time through an explicit lifecycle:
//! `Idle → Submitting → Polling → FetchingPeptides → Completed`, with every
//! failure path landing back in `Idle`. The tracker is the only writer of the
//! persisted [`store::TrackedDigest`] record, which lets a restarted client
//! resume polling an in-flight job instead of re-submitting it.

pub mod delete;
pub mod errors;
pub mod input;
pub mod paths;
pub mod poll;
pub mod store;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testutil;

pub use delete::{AccountGateway, DeleteCoordinator, DeleteKind, DeleteRequest};
pub use errors::{ErrorKind, ErrorSink, TrackError};
pub use input::DigestInput;
pub use poll::PollConfig;
pub use store::{DigestDraft, DraftStore, TrackedDigest, TrackedDigestStore};
pub use tracker::{DigestTracker, Phase, TrackerSnapshot};
