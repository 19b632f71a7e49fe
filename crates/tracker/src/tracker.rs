// crates/tracker/src/tracker.rs
//! The digest lifecycle machine.
//!
//! `Idle → Submitting → Polling → FetchingPeptides → Completed`, every
//! failure path landing back in `Idle`. The machine owns the persisted
//! [`TrackedDigest`] record and writes it under the state lock at every
//! transition, so a crash mid-flow leaves storage consistent with the last
//! confirmed phase. Poll ticks run on a spawned task; each session carries a
//! generation number and a cancellation token, and every mutation re-checks
//! both under the state lock so superseded callbacks are inert.

use std::sync::{Arc, Mutex, MutexGuard};

use qpeptide_api::{
    ApiError, DigestApi, DigestPeptidesResponse, DigestResponse, NewDigestRequest,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{ErrorSink, TrackError};
use crate::input::DigestInput;
use crate::poll::{PollConfig, PollScheduler, PollSession};
use crate::store::{TrackedDigest, TrackedDigestStore};

/// Protease submitted with every digest job.
const PROTEASE: &str = "trypsin";

/// Lifecycle phase of the tracked digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    Polling,
    FetchingPeptides,
    Completed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Submitting => "submitting",
            Phase::Polling => "polling",
            Phase::FetchingPeptides => "fetching",
            Phase::Completed => "completed",
        }
    }

    /// Phases during which a new submission is rejected.
    fn is_busy(&self) -> bool {
        matches!(
            self,
            Phase::Submitting | Phase::Polling | Phase::FetchingPeptides
        )
    }
}

#[derive(Debug, Clone, Default)]
struct TrackState {
    phase: Phase,
    digest_id: Option<String>,
    digest: Option<DigestResponse>,
    peptides: Option<DigestPeptidesResponse>,
}

/// Read-only copy of the tracker state for display.
#[derive(Debug, Clone)]
pub struct TrackerSnapshot {
    pub phase: Phase,
    pub digest_id: Option<String>,
    pub digest: Option<DigestResponse>,
    pub peptides: Option<DigestPeptidesResponse>,
}

/// Handle to the single per-session lifecycle machine. Cheap to clone;
/// clones share state.
#[derive(Clone)]
pub struct DigestTracker {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn DigestApi>,
    errors: Arc<ErrorSink>,
    store: TrackedDigestStore,
    config: PollConfig,
    owner: Option<String>,
    state: Mutex<TrackState>,
    scheduler: PollScheduler,
}

impl DigestTracker {
    pub fn new(
        api: Arc<dyn DigestApi>,
        errors: Arc<ErrorSink>,
        store: TrackedDigestStore,
        owner: Option<String>,
        config: PollConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                errors,
                store,
                config,
                owner,
                state: Mutex::new(TrackState::default()),
                scheduler: PollScheduler::new(),
            }),
        }
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock_state().phase
    }

    pub fn digest_id(&self) -> Option<String> {
        self.inner.lock_state().digest_id.clone()
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        let st = self.inner.lock_state();
        TrackerSnapshot {
            phase: st.phase,
            digest_id: st.digest_id.clone(),
            digest: st.digest.clone(),
            peptides: st.peptides.clone(),
        }
    }

    /// Submit a new digest job and start tracking it.
    ///
    /// A no-op while a submission is already in flight. Validation failures
    /// and network/server errors surface through the [`ErrorSink`] and leave
    /// the machine in `Idle`.
    pub async fn submit(&self, input: DigestInput) {
        let inner = &self.inner;
        {
            let st = inner.lock_state();
            if st.phase.is_busy() {
                debug!(phase = st.phase.as_str(), "submit ignored; digest already in flight");
                return;
            }
        }

        let validated = match input.validate() {
            Ok(v) => v,
            Err(e) => {
                inner.errors.report(e);
                return;
            }
        };
        let Some(owner) = inner.owner.clone() else {
            inner.errors.report(TrackError::Server {
                status: 401,
                message: "You must be logged in to submit a digest.".to_string(),
            });
            return;
        };

        {
            let mut st = inner.lock_state();
            if st.phase.is_busy() {
                return;
            }
            *st = TrackState {
                phase: Phase::Submitting,
                ..TrackState::default()
            };
            inner.persist(&st);
        }
        info!(
            protein_name = %validated.protein_name,
            residues = validated.sequence.len(),
            "submitting digest"
        );

        let request = NewDigestRequest {
            user_id: owner,
            protease: PROTEASE.to_string(),
            protein_name: validated.protein_name,
            sequence: validated.sequence,
        };
        match inner.api.create_digest(&request).await {
            Ok(digest_id) => {
                // A reset may have won while the request was in flight; the
                // late response is then discarded, not applied.
                if !self.start_polling_from(Phase::Submitting, digest_id.clone(), false) {
                    debug!(digest_id = %digest_id, "create response discarded after reset");
                }
            }
            Err(e) => {
                inner.errors.report(TrackError::from_api(e));
                let mut st = inner.lock_state();
                if st.phase == Phase::Submitting {
                    *st = TrackState::default();
                    inner.persist(&st);
                }
            }
        }
    }

    /// Resume tracking from the persisted record, if one exists and an owner
    /// identity is available. Never re-submits: the machine enters `Polling`
    /// directly and the first tick reconciles against true server status —
    /// a job that finished while the client was away chains straight into
    /// the peptide fetch.
    pub fn resume(&self) -> bool {
        let inner = &self.inner;
        if inner.owner.is_none() {
            return false;
        }
        let Some(record) = inner.store.load() else {
            return false;
        };
        if record.digest_id.is_empty() {
            return false;
        }
        info!(
            digest_id = %record.digest_id,
            last_status = %record.status,
            "resuming digest tracking"
        );
        self.start_polling_from(Phase::Idle, record.digest_id, true)
    }

    /// Return to `Idle` from any phase: cancels the active poll session and
    /// clears the persisted record.
    pub fn reset(&self) {
        let inner = &self.inner;
        let mut st = inner.lock_state();
        inner.scheduler.cancel_active();
        *st = TrackState::default();
        inner.persist(&st);
        info!("digest tracking reset");
    }

    /// Transition into `Polling` if the machine is still in `expected`,
    /// superseding any previous poll session, then spawn the poll loop.
    fn start_polling_from(&self, expected: Phase, digest_id: String, resumed: bool) -> bool {
        let inner = &self.inner;
        let session = {
            let mut st = inner.lock_state();
            if st.phase != expected {
                return false;
            }
            let session = inner.scheduler.begin();
            *st = TrackState {
                phase: Phase::Polling,
                digest_id: Some(digest_id.clone()),
                ..TrackState::default()
            };
            inner.persist(&st);
            session
        };
        info!(digest_id = %digest_id, resumed, "status polling started");
        tokio::spawn(run_poll_loop(
            Arc::clone(inner),
            session,
            digest_id,
            resumed,
        ));
        true
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, TrackState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Keep the persisted record in sync with `state`. Called with the state
    /// lock held, so storage always matches the last confirmed transition.
    fn persist(&self, state: &TrackState) {
        match &state.digest_id {
            Some(id) => self.store.save(&TrackedDigest {
                digest_id: id.clone(),
                status: state.phase.as_str().to_string(),
            }),
            None => self.store.clear(),
        }
    }

    /// Apply a mutation only if `session` is still the active one. The check
    /// runs under the state lock — the same lock under which sessions are
    /// superseded — so a stale callback can never interleave with its
    /// replacement.
    fn with_state_if_current<R>(
        &self,
        session: &PollSession,
        apply: impl FnOnce(&mut TrackState) -> R,
    ) -> Option<R> {
        let mut st = self.lock_state();
        if !self.scheduler.is_current(session) {
            return None;
        }
        Some(apply(&mut st))
    }

    /// Terminal failure: end the session, land in `Idle`, report once.
    fn fail_to_idle(&self, session: &PollSession, error: TrackError) {
        let applied = self.with_state_if_current(session, |st| {
            self.scheduler.cancel_active();
            *st = TrackState::default();
            self.persist(st);
        });
        if applied.is_some() {
            self.errors.report(error);
        }
    }

    /// End the session and land in `Idle` without reporting (stale record
    /// reconciliation).
    fn clear_to_idle(&self, session: &PollSession) {
        let _ = self.with_state_if_current(session, |st| {
            self.scheduler.cancel_active();
            *st = TrackState::default();
            self.persist(st);
        });
    }

    fn poll_timed_out(&self, session: &PollSession) {
        self.fail_to_idle(
            session,
            TrackError::Timeout(
                "Digest timed out after 5 minutes. Find the record in the Digests list."
                    .to_string(),
            ),
        );
    }

    /// One-time peptide fetch after a poll observed `completed`. Bounded by
    /// its own timeout, distinct from the poll ceiling.
    async fn fetch_peptides(
        &self,
        session: &PollSession,
        owner: &str,
        digest_id: &str,
        digest: DigestResponse,
    ) {
        let entered = self.with_state_if_current(session, |st| {
            if st.phase != Phase::Polling {
                return false;
            }
            st.phase = Phase::FetchingPeptides;
            st.digest = Some(digest);
            self.persist(st);
            true
        });
        if entered != Some(true) {
            return;
        }
        info!(digest_id = %digest_id, "digest completed; fetching peptides");

        let result = tokio::time::timeout(
            self.config.fetch_timeout,
            self.api.get_peptides(owner, digest_id),
        )
        .await;
        match result {
            Err(_) => self.fail_to_idle(
                session,
                TrackError::Timeout(
                    "Peptide fetch timed out. Try opening the digest from the Digests list."
                        .to_string(),
                ),
            ),
            Ok(Err(e)) => self.fail_to_idle(session, TrackError::from_api(e)),
            Ok(Ok(peptides)) => {
                let count = peptides.peptides.len();
                let applied = self.with_state_if_current(session, |st| {
                    self.scheduler.cancel_active();
                    st.phase = Phase::Completed;
                    st.peptides = Some(peptides);
                    self.persist(st);
                });
                if applied.is_some() {
                    info!(digest_id = %digest_id, peptides = count, "digest tracking completed");
                }
            }
        }
    }
}

/// The poll loop for one session. First tick fires after one fast interval,
/// never immediately; the ceiling and the cancellation token can interrupt
/// any wait, including an in-flight status request.
async fn run_poll_loop(
    inner: Arc<Inner>,
    session: PollSession,
    digest_id: String,
    resumed: bool,
) {
    let Some(owner) = inner.owner.clone() else {
        return;
    };
    let started = Instant::now();
    let deadline = started + inner.config.poll_timeout;
    let mut delay = inner.config.fast_interval;
    let mut first_tick = true;

    loop {
        tokio::select! {
            biased;
            _ = session.cancel.cancelled() => return,
            _ = tokio::time::sleep_until(deadline) => {
                inner.poll_timed_out(&session);
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let status = tokio::select! {
            biased;
            _ = session.cancel.cancelled() => return,
            _ = tokio::time::sleep_until(deadline) => {
                inner.poll_timed_out(&session);
                return;
            }
            result = inner.api.get_digest(&owner, &digest_id) => result,
        };

        match status {
            Ok(digest) if digest.is_completed() => {
                inner.fetch_peptides(&session, &owner, &digest_id, digest).await;
                return;
            }
            Ok(digest) if digest.is_failed() => {
                inner.fail_to_idle(
                    &session,
                    TrackError::Server {
                        status: 500,
                        message: "Digest processing failed on the server. Please try again."
                            .to_string(),
                    },
                );
                return;
            }
            Ok(digest) => {
                debug!(digest_id = %digest_id, status = %digest.status, "digest still in progress");
            }
            Err(ApiError::Server { status, .. })
                if resumed && first_tick && (400..500).contains(&status) =>
            {
                // Reconciliation after restart: the stored id no longer
                // resolves. Drop the record instead of polling a ghost.
                warn!(digest_id = %digest_id, status, "stored digest no longer resolves; clearing record");
                inner.clear_to_idle(&session);
                return;
            }
            Err(e) => {
                // Transient tick failure; only the ceiling bounds the session.
                debug!(digest_id = %digest_id, error = %e, "poll tick failed; will retry");
            }
        }

        first_tick = false;
        delay = inner.config.delay_for(started.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::testutil::{completed_digest, digest_with_status, test_config, ScriptedApi};
    use std::time::Duration;

    fn valid_input() -> DigestInput {
        DigestInput {
            protein_name: "Insulin".to_string(),
            sequence: "MALWMRLLPL".to_string(),
        }
    }

    struct Fixture {
        api: Arc<ScriptedApi>,
        errors: Arc<ErrorSink>,
        store: TrackedDigestStore,
        tracker: DigestTracker,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        fixture_with_owner(Some("u-1".to_string()))
    }

    fn fixture_with_owner(owner: Option<String>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(ScriptedApi::new());
        let errors = Arc::new(ErrorSink::new());
        let store = TrackedDigestStore::new(dir.path().join("digest-state.json"));
        let tracker = DigestTracker::new(
            api.clone(),
            errors.clone(),
            store.clone(),
            owner,
            test_config(),
        );
        Fixture {
            api,
            errors,
            store,
            tracker,
            _dir: dir,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn submit_enters_polling_and_persists() {
        let f = fixture();
        f.tracker.submit(valid_input()).await;

        assert_eq!(f.tracker.phase(), Phase::Polling);
        assert_eq!(f.tracker.digest_id().as_deref(), Some("d-test"));
        let record = f.store.load().unwrap();
        assert_eq!(record.digest_id, "d-test");
        assert_eq!(record.status, "polling");
        assert_eq!(f.api.count("create"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn second_submit_while_busy_is_a_no_op() {
        let f = fixture();
        f.tracker.submit(valid_input()).await;
        f.tracker.submit(valid_input()).await;

        assert_eq!(f.api.count("create"), 1);
        assert_eq!(f.tracker.phase(), Phase::Polling);
        assert!(f.errors.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_input_reports_and_stays_idle() {
        let f = fixture();
        f.tracker
            .submit(DigestInput {
                protein_name: String::new(),
                sequence: "ACDE".to_string(),
            })
            .await;

        assert_eq!(f.tracker.phase(), Phase::Idle);
        assert_eq!(f.api.count("create"), 0);
        let err = f.errors.current().unwrap();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_without_owner_reports_401() {
        let f = fixture_with_owner(None);
        f.tracker.submit(valid_input()).await;

        assert_eq!(f.tracker.phase(), Phase::Idle);
        let err = f.errors.current().unwrap();
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test(start_paused = true)]
    async fn create_failure_reports_and_returns_to_idle() {
        let f = fixture();
        f.api.push_create(Err(ApiError::Server {
            status: 422,
            message: "sequence rejected".to_string(),
        }));
        f.tracker.submit(valid_input()).await;

        assert_eq!(f.tracker.phase(), Phase::Idle);
        assert!(f.store.load().is_none());
        let err = f.errors.current().unwrap();
        assert_eq!(err.status_code(), 422);
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_fast_interval() {
        let f = fixture();
        f.tracker.submit(valid_input()).await;

        tokio::time::sleep(test_config().fast_interval - Duration::from_millis(10)).await;
        assert_eq!(f.api.count("status"), 0);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(f.api.count("status"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cadence_is_fast_then_slow() {
        let f = fixture();
        let config = test_config();
        let start = Instant::now();
        f.tracker.submit(valid_input()).await;

        // Through the fast phase (10 intervals) plus two slow ticks.
        tokio::time::sleep(config.fast_phase + config.slow_interval * 2 + Duration::from_millis(5))
            .await;

        let offsets = f.api.status_offsets(start);
        let fast = config.fast_interval;
        let slow = config.slow_interval;
        let expected: Vec<Duration> = (1..=10u32)
            .map(|i| fast * i)
            .chain([config.fast_phase + slow, config.fast_phase + slow * 2])
            .collect();
        assert_eq!(offsets, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_digest_chains_into_peptide_fetch() {
        let f = fixture();
        f.api.push_status(Ok(completed_digest("d-test")));
        f.tracker.submit(valid_input()).await;

        tokio::time::sleep(test_config().fast_interval * 2).await;

        let snapshot = f.tracker.snapshot();
        assert_eq!(snapshot.phase, Phase::Completed);
        // Zero peptides is a valid terminal state, not an error.
        assert_eq!(snapshot.peptides.unwrap().peptides.len(), 0);
        assert!(f.errors.current().is_none());
        // The record survives completion until an explicit reset.
        assert_eq!(f.store.load().unwrap().status, "completed");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_digest_reports_server_error_and_clears() {
        let f = fixture();
        f.api.push_status(Ok(digest_with_status("d-test", "failed")));
        f.tracker.submit(valid_input()).await;

        tokio::time::sleep(test_config().fast_interval * 2).await;

        assert_eq!(f.tracker.phase(), Phase::Idle);
        assert!(f.store.load().is_none());
        let err = f.errors.current().unwrap();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("failed on the server"));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_tick_failures_keep_polling() {
        let f = fixture();
        f.api.push_status(Err(ApiError::Network("connection reset".to_string())));
        f.api.push_status(Err(ApiError::Server {
            status: 503,
            message: "overloaded".to_string(),
        }));
        f.tracker.submit(valid_input()).await;

        tokio::time::sleep(test_config().fast_interval * 4).await;

        assert_eq!(f.tracker.phase(), Phase::Polling);
        assert!(f.api.count("status") >= 3);
        assert!(f.errors.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn poll_ceiling_reports_exactly_one_timeout() {
        let f = fixture();
        let config = test_config();
        f.tracker.submit(valid_input()).await;

        tokio::time::sleep(config.poll_timeout + config.fast_interval).await;

        assert_eq!(f.tracker.phase(), Phase::Idle);
        assert!(f.store.load().is_none());
        let err = f.errors.take().unwrap();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.status_code(), 0);

        // No further ticks or reports after the ceiling fired.
        let ticks = f.api.count("status");
        tokio::time::sleep(config.slow_interval * 4).await;
        assert_eq!(f.api.count("status"), ticks);
        assert!(f.errors.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cancels_polling_and_later_ticks_are_inert() {
        let f = fixture();
        let config = test_config();
        f.tracker.submit(valid_input()).await;
        tokio::time::sleep(config.fast_interval + Duration::from_millis(5)).await;
        assert_eq!(f.api.count("status"), 1);

        f.tracker.reset();
        assert_eq!(f.tracker.phase(), Phase::Idle);
        assert!(f.store.load().is_none());

        let ticks = f.api.count("status");
        tokio::time::sleep(config.slow_interval * 4).await;
        assert_eq!(f.api.count("status"), ticks);
        assert_eq!(f.tracker.phase(), Phase::Idle);
        assert!(f.errors.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn create_response_after_reset_is_discarded() {
        let f = fixture();
        let config = test_config();
        f.api.set_create_delay(config.fast_interval * 5);

        let tracker = f.tracker.clone();
        let submit = tokio::spawn(async move { tracker.submit(valid_input()).await });

        tokio::time::sleep(config.fast_interval).await;
        assert_eq!(f.tracker.phase(), Phase::Submitting);
        f.tracker.reset();

        submit.await.unwrap();
        assert_eq!(f.tracker.phase(), Phase::Idle);
        assert_eq!(f.api.count("status"), 0);
        assert!(f.store.load().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn resume_polls_stored_id_without_resubmitting() {
        let f = fixture();
        f.store.save(&TrackedDigest {
            digest_id: "d-9".to_string(),
            status: "completed".to_string(),
        });
        f.api.push_status(Ok(completed_digest("d-9")));

        assert!(f.tracker.resume());
        assert_eq!(f.tracker.phase(), Phase::Polling);

        tokio::time::sleep(test_config().fast_interval * 2).await;

        let snapshot = f.tracker.snapshot();
        assert_eq!(snapshot.phase, Phase::Completed);
        assert_eq!(snapshot.digest_id.as_deref(), Some("d-9"));
        assert_eq!(f.api.count("create"), 0);
        assert_eq!(f.api.count("peptides"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_without_owner_or_record_does_nothing() {
        let f = fixture_with_owner(None);
        f.store.save(&TrackedDigest {
            digest_id: "d-9".to_string(),
            status: "polling".to_string(),
        });
        assert!(!f.tracker.resume());
        assert_eq!(f.tracker.phase(), Phase::Idle);

        let f = fixture();
        assert!(!f.tracker.resume());
        assert_eq!(f.tracker.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_record_clears_on_first_reconciliation_tick() {
        let f = fixture();
        f.store.save(&TrackedDigest {
            digest_id: "d-gone".to_string(),
            status: "polling".to_string(),
        });
        f.api.push_status(Err(ApiError::Server {
            status: 404,
            message: "Digest not found".to_string(),
        }));

        assert!(f.tracker.resume());
        tokio::time::sleep(test_config().fast_interval * 2).await;

        assert_eq!(f.tracker.phase(), Phase::Idle);
        assert!(f.store.load().is_none());
        // Reconciliation is silent; nothing to retry.
        assert!(f.errors.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_4xx_after_the_first_tick_keeps_polling() {
        let f = fixture();
        f.store.save(&TrackedDigest {
            digest_id: "d-9".to_string(),
            status: "polling".to_string(),
        });
        f.api.push_status(Ok(digest_with_status("d-9", "running")));
        f.api.push_status(Err(ApiError::Server {
            status: 404,
            message: "Digest not found".to_string(),
        }));

        assert!(f.tracker.resume());
        tokio::time::sleep(test_config().fast_interval * 4).await;

        assert_eq!(f.tracker.phase(), Phase::Polling);
        assert!(f.store.load().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn peptide_fetch_timeout_reports_and_clears() {
        let f = fixture();
        let config = test_config();
        f.api.push_status(Ok(completed_digest("d-test")));
        f.api.set_peptide_delay(config.fetch_timeout * 2);
        f.tracker.submit(valid_input()).await;

        tokio::time::sleep(config.fast_interval + config.fetch_timeout + config.fast_interval)
            .await;

        assert_eq!(f.tracker.phase(), Phase::Idle);
        assert!(f.store.load().is_none());
        let err = f.errors.current().unwrap();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.to_string().contains("Peptide fetch timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn peptide_fetch_failure_reports_and_clears() {
        let f = fixture();
        f.api.push_status(Ok(completed_digest("d-test")));
        f.api.push_peptides(Err(ApiError::Server {
            status: 500,
            message: "Failed to fetch peptides (500)".to_string(),
        }));
        f.tracker.submit(valid_input()).await;

        tokio::time::sleep(test_config().fast_interval * 2).await;

        assert_eq!(f.tracker.phase(), Phase::Idle);
        assert!(f.store.load().is_none());
        let err = f.errors.current().unwrap();
        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_is_accepted_again_after_completion() {
        let f = fixture();
        f.api.push_status(Ok(completed_digest("d-test")));
        f.tracker.submit(valid_input()).await;
        tokio::time::sleep(test_config().fast_interval * 2).await;
        assert_eq!(f.tracker.phase(), Phase::Completed);

        f.api.push_create(Ok("d-next".to_string()));
        f.tracker.submit(valid_input()).await;
        assert_eq!(f.tracker.phase(), Phase::Polling);
        assert_eq!(f.tracker.digest_id().as_deref(), Some("d-next"));
    }
}
