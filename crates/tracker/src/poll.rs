// crates/tracker/src/poll.rs
//! Adaptive poll cadence and single-session scheduling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Timing knobs for one polling session. Production uses [`Default`];
/// tests compress the intervals to milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Inter-poll delay while the job is young.
    pub fast_interval: Duration,
    /// Inter-poll delay once the fast phase has elapsed.
    pub slow_interval: Duration,
    /// How long the fast cadence lasts, measured from session start.
    pub fast_phase: Duration,
    /// Hard ceiling on a whole polling session.
    pub poll_timeout: Duration,
    /// Ceiling on the one-time peptide fetch, separate from the poll ceiling.
    pub fetch_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            fast_interval: Duration::from_secs(1),
            slow_interval: Duration::from_secs(5),
            fast_phase: Duration::from_secs(10),
            poll_timeout: Duration::from_secs(5 * 60),
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl PollConfig {
    /// Delay before the next tick, given time elapsed since session start.
    pub fn delay_for(&self, elapsed: Duration) -> Duration {
        if elapsed < self.fast_phase {
            self.fast_interval
        } else {
            self.slow_interval
        }
    }
}

/// Handle for one polling session.
///
/// The generation number makes superseded callbacks inert even when timer
/// cancellation races with a callback that is already in flight: every
/// state mutation re-checks the generation under the state lock.
pub(crate) struct PollSession {
    pub generation: u64,
    pub cancel: CancellationToken,
}

/// Issues poll sessions, enforcing at most one active session.
pub(crate) struct PollScheduler {
    generation: AtomicU64,
    active: Mutex<Option<CancellationToken>>,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    /// Cancel any existing session and open a new one. The old token is
    /// cancelled before the new generation becomes observable.
    pub fn begin(&self) -> PollSession {
        let mut active = self.lock();
        if let Some(previous) = active.take() {
            previous.cancel();
        }
        let cancel = CancellationToken::new();
        *active = Some(cancel.clone());
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        PollSession { generation, cancel }
    }

    /// Cancel the active session, if any, without opening a new one.
    pub fn cancel_active(&self) {
        if let Some(token) = self.lock().take() {
            token.cancel();
        }
    }

    /// Generation of the most recently opened session.
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether `session` is still the active one.
    pub fn is_current(&self, session: &PollSession) -> bool {
        !session.cancel.is_cancelled() && self.current_generation() == session.generation
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}
