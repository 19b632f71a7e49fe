// crates/tracker/src/delete.rs
//! Deletion of digests and of the owning account, with a two-step
//! confirmation flow.
//!
//! `Idle → Requested → Confirming → (Idle | Requested)`. Deleting the digest
//! currently being tracked resets the lifecycle machine synchronously, so a
//! completed view can never point at a deleted digest.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use qpeptide_api::{ApiError, DigestApi};
use tracing::{debug, info, warn};

use crate::errors::{ErrorSink, TrackError};
use crate::tracker::DigestTracker;

/// What a delete request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteKind {
    /// One or more digest jobs.
    Digest,
    /// The owning account; the server cascades to all owned digests and the
    /// client signs out.
    User,
}

/// A pending deletion awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub ids: Vec<String>,
    pub kind: DeleteKind,
}

#[derive(Debug, Clone)]
enum DeletePhase {
    Idle,
    Requested(DeleteRequest),
    Confirming(DeleteRequest),
}

/// Identity collaborator: deletes the account server-side and signs the
/// client out. The sign-in flow itself lives outside this crate.
#[async_trait]
pub trait AccountGateway: Send + Sync {
    async fn delete_account_and_sign_out(&self) -> Result<(), ApiError>;
}

/// Coordinates delete requests against the digest service and keeps the
/// lifecycle machine consistent with what was deleted.
pub struct DeleteCoordinator {
    api: Arc<dyn DigestApi>,
    errors: Arc<ErrorSink>,
    tracker: DigestTracker,
    accounts: Arc<dyn AccountGateway>,
    owner: Option<String>,
    state: Mutex<DeletePhase>,
}

impl DeleteCoordinator {
    pub fn new(
        api: Arc<dyn DigestApi>,
        errors: Arc<ErrorSink>,
        tracker: DigestTracker,
        accounts: Arc<dyn AccountGateway>,
        owner: Option<String>,
    ) -> Self {
        Self {
            api,
            errors,
            tracker,
            accounts,
            owner,
            state: Mutex::new(DeletePhase::Idle),
        }
    }

    /// Stage a deletion for confirmation. Replaces any earlier staged
    /// request; ignored while a confirmation is running.
    pub fn request(&self, ids: Vec<String>, kind: DeleteKind) {
        let mut st = self.lock();
        if matches!(*st, DeletePhase::Confirming(_)) {
            debug!("delete request ignored; a deletion is already running");
            return;
        }
        *st = DeletePhase::Requested(DeleteRequest { ids, kind });
    }

    /// Drop the staged request, if any. A running confirmation is unaffected.
    pub fn cancel(&self) {
        let mut st = self.lock();
        if matches!(*st, DeletePhase::Requested(_)) {
            *st = DeletePhase::Idle;
        }
    }

    /// The staged request awaiting confirmation.
    pub fn pending(&self) -> Option<DeleteRequest> {
        match &*self.lock() {
            DeletePhase::Requested(req) => Some(req.clone()),
            _ => None,
        }
    }

    pub fn is_deleting(&self) -> bool {
        matches!(*self.lock(), DeletePhase::Confirming(_))
    }

    /// Execute the staged deletion. Returns `true` when everything
    /// succeeded; on failure the request is re-staged so the user can retry.
    /// A second confirm while one is running is rejected.
    pub async fn confirm(&self) -> bool {
        let request = {
            let mut st = self.lock();
            match &*st {
                DeletePhase::Requested(req) if !req.ids.is_empty() => {
                    let req = req.clone();
                    *st = DeletePhase::Confirming(req.clone());
                    req
                }
                DeletePhase::Confirming(_) => {
                    debug!("confirm ignored; deletion already running");
                    return false;
                }
                _ => return false,
            }
        };

        let ok = match request.kind {
            DeleteKind::User => self.delete_account().await,
            DeleteKind::Digest => self.delete_digests(&request.ids).await,
        };

        *self.lock() = if ok {
            DeletePhase::Idle
        } else {
            DeletePhase::Requested(request)
        };
        ok
    }

    async fn delete_digests(&self, ids: &[String]) -> bool {
        let Some(owner) = self.owner.clone() else {
            self.errors.report(TrackError::Server {
                status: 401,
                message: "You must be logged in to delete digests.".to_string(),
            });
            return false;
        };

        let mut failures = Vec::new();
        for digest_id in ids {
            match self.api.delete_digest(&owner, digest_id).await {
                Ok(()) => {
                    info!(digest_id = %digest_id, "digest deleted");
                    if self.tracker.digest_id().as_deref() == Some(digest_id.as_str()) {
                        // The tracked digest is gone; reset before reporting
                        // overall success so no view can still show it.
                        self.tracker.reset();
                    }
                }
                Err(ApiError::Server { status, message }) => {
                    warn!(digest_id = %digest_id, status, "digest delete failed");
                    failures.push(message);
                }
                Err(ApiError::Network(_)) => {
                    self.errors.report(TrackError::Network);
                    return false;
                }
            }
        }

        if failures.is_empty() {
            true
        } else {
            // Succeeded deletions are not rolled back; report the rest as one
            // aggregated failure.
            self.errors.report(TrackError::PartialBatch { failures });
            false
        }
    }

    async fn delete_account(&self) -> bool {
        match self.accounts.delete_account_and_sign_out().await {
            Ok(()) => {
                // No tracked digest may outlive its owner.
                self.tracker.reset();
                info!("account deleted and signed out");
                true
            }
            Err(e) => {
                self.errors.report(TrackError::from_api(e));
                false
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, DeletePhase> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
