// crates/tracker/src/testutil.rs
//! Scripted [`DigestApi`] implementation for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use qpeptide_api::{
    ApiError, DigestApi, DigestPeptidesResponse, DigestResponse, NewDigestRequest,
};
use tokio::time::Instant;

use crate::poll::PollConfig;

/// Compressed timing for paused-clock tests; proportions match production
/// (fast : slow : fast-phase = 1 : 5 : 10).
pub(crate) fn test_config() -> PollConfig {
    PollConfig {
        fast_interval: Duration::from_millis(100),
        slow_interval: Duration::from_millis(500),
        fast_phase: Duration::from_millis(1000),
        poll_timeout: Duration::from_secs(30),
        fetch_timeout: Duration::from_secs(3),
    }
}

pub(crate) fn digest_with_status(id: &str, status: &str) -> DigestResponse {
    DigestResponse {
        id: id.to_string(),
        status: status.to_string(),
        user_id: "u-1".to_string(),
        protease: "trypsin".to_string(),
        protein_name: Some("Insulin".to_string()),
        sequence: "MALWMRLLPL".to_string(),
        created_at: "2026-08-01T10:00:00".to_string(),
        updated_at: "2026-08-01T10:00:05".to_string(),
    }
}

pub(crate) fn completed_digest(id: &str) -> DigestResponse {
    digest_with_status(id, "completed")
}

pub(crate) fn empty_peptides(id: &str) -> DigestPeptidesResponse {
    DigestPeptidesResponse {
        digest_id: id.to_string(),
        peptides: Vec::new(),
        criteria: Vec::new(),
    }
}

struct Recorded {
    op: &'static str,
    at: Instant,
}

/// Scripted API double. Queued replies are consumed in order; an empty queue
/// falls back to a benign default (`Ok` with a "running" digest, an empty
/// peptide set, a successful create). Per-id delete failures are configured
/// up front. All calls are recorded with their (virtual) timestamps.
pub(crate) struct ScriptedApi {
    create_replies: Mutex<VecDeque<Result<String, ApiError>>>,
    status_replies: Mutex<VecDeque<Result<DigestResponse, ApiError>>>,
    peptide_replies: Mutex<VecDeque<Result<DigestPeptidesResponse, ApiError>>>,
    create_delay: Mutex<Option<Duration>>,
    peptide_delay: Mutex<Option<Duration>>,
    failing_deletes: Mutex<HashMap<String, u16>>,
    unreachable_deletes: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    calls: Mutex<Vec<Recorded>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            create_replies: Mutex::new(VecDeque::new()),
            status_replies: Mutex::new(VecDeque::new()),
            peptide_replies: Mutex::new(VecDeque::new()),
            create_delay: Mutex::new(None),
            peptide_delay: Mutex::new(None),
            failing_deletes: Mutex::new(HashMap::new()),
            unreachable_deletes: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_create(&self, reply: Result<String, ApiError>) {
        self.create_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_status(&self, reply: Result<DigestResponse, ApiError>) {
        self.status_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_peptides(&self, reply: Result<DigestPeptidesResponse, ApiError>) {
        self.peptide_replies.lock().unwrap().push_back(reply);
    }

    pub fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_peptide_delay(&self, delay: Duration) {
        *self.peptide_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_delete(&self, digest_id: &str, status: u16) {
        self.failing_deletes
            .lock()
            .unwrap()
            .insert(digest_id.to_string(), status);
    }

    /// Deleting this id fails at the transport level.
    pub fn fail_delete_network(&self, digest_id: &str) {
        self.unreachable_deletes
            .lock()
            .unwrap()
            .push(digest_id.to_string());
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Number of recorded calls for one operation.
    pub fn count(&self, op: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.op == op).count()
    }

    /// Offsets of every status call relative to `start`.
    pub fn status_offsets(&self, start: Instant) -> Vec<Duration> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.op == "status")
            .map(|c| c.at.duration_since(start))
            .collect()
    }

    fn record(&self, op: &'static str) {
        self.calls.lock().unwrap().push(Recorded {
            op,
            at: Instant::now(),
        });
    }
}

#[async_trait]
impl DigestApi for ScriptedApi {
    async fn create_digest(&self, _request: &NewDigestRequest) -> Result<String, ApiError> {
        self.record("create");
        let delay = *self.create_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.create_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("d-test".to_string()))
    }

    async fn get_digest(
        &self,
        _user_id: &str,
        digest_id: &str,
    ) -> Result<DigestResponse, ApiError> {
        self.record("status");
        self.status_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(digest_with_status(digest_id, "running")))
    }

    async fn get_peptides(
        &self,
        _user_id: &str,
        digest_id: &str,
    ) -> Result<DigestPeptidesResponse, ApiError> {
        self.record("peptides");
        let delay = *self.peptide_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.peptide_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(empty_peptides(digest_id)))
    }

    async fn delete_digest(&self, _user_id: &str, digest_id: &str) -> Result<(), ApiError> {
        self.record("delete");
        if self
            .unreachable_deletes
            .lock()
            .unwrap()
            .iter()
            .any(|id| id == digest_id)
        {
            return Err(ApiError::Network("connection refused".to_string()));
        }
        if let Some(status) = self.failing_deletes.lock().unwrap().get(digest_id) {
            return Err(ApiError::Server {
                status: *status,
                message: format!("Failed to delete digest {digest_id} ({status})"),
            });
        }
        self.deleted.lock().unwrap().push(digest_id.to_string());
        Ok(())
    }

    async fn delete_user(&self, _user_id: &str) -> Result<(), ApiError> {
        self.record("delete_user");
        Ok(())
    }
}
