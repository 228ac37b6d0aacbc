//! Bounded status polling with cooperative detachment.
//!
//! The tracking loop is the only place in the crate with scheduled recurring
//! work: fetch a snapshot, hand it to the caller, classify, then either stop
//! or sleep out a fixed interval and go again. One status call is in flight
//! at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::status::StatusClass;
use crate::task;
use crate::transport::Transport;
use crate::types::StatusSnapshot;

/// Retry budget for [`track_until_done`].
///
/// The delay between fetches is fixed; worst-case wall clock is
/// `attempts × interval` plus the time spent inside the status calls. The
/// default budget is 300 × 1 s, roughly five minutes, which suits image
/// jobs. Video jobs want [`PollConfig::video`] or a custom interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Maximum number of status fetches.
    pub attempts: u32,
    /// Pause between consecutive fetches.
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            attempts: 300,
            interval: Duration::from_secs(1),
        }
    }
}

impl PollConfig {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Budget suited to video generation, which runs for minutes: 20 fetches
    /// half a minute apart.
    pub fn video() -> Self {
        Self {
            attempts: 20,
            interval: Duration::from_secs(30),
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Cooperative detachment handle for [`track_until_done_with`].
///
/// Clones share one flag. Cancelling never aborts an in-flight status call;
/// the loop observes the flag before scheduling the next cycle, so one final
/// snapshot may still reach `on_update` after [`cancel`](Self::cancel).
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests detachment.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Polls `task_id` until a terminal status or an exhausted budget.
///
/// Convenience wrapper over [`track_until_done_with`] with no detachment
/// handle and no progress reporting.
pub async fn track_until_done(
    transport: &dyn Transport,
    api_base: &str,
    task_id: i64,
    config: &PollConfig,
) -> Result<StatusSnapshot> {
    track_until_done_with(transport, api_base, task_id, config, &CancelFlag::new(), |_| {}).await
}

/// Polls `task_id`, emitting every snapshot, until something terminal.
///
/// Snapshots reach `on_update` strictly in fetch order and unconditionally,
/// before any classification decision, so callers see partial progress and
/// moderation verdicts the moment the service reports them.
///
/// Terminal mapping: a *success* snapshot resolves the call; *failed* becomes
/// [`Error::JobFailed`]; *not-found* becomes [`Error::TaskNotFound`]; an
/// exhausted budget while still *processing* becomes [`Error::PollExhausted`];
/// a cancelled flag becomes [`Error::Cancelled`].
///
/// # Example
///
/// ```ignore
/// let done = track_until_done_with(
///     &client,
///     API_BASE,
///     submission.task_id(),
///     &PollConfig::default(),
///     &CancelFlag::new(),
///     |snapshot| println!("{} (eta {}s)", snapshot.status, snapshot.eta_time),
/// )
/// .await?;
/// ```
pub async fn track_until_done_with(
    transport: &dyn Transport,
    api_base: &str,
    task_id: i64,
    config: &PollConfig,
    cancel: &CancelFlag,
    mut on_update: impl FnMut(&StatusSnapshot),
) -> Result<StatusSnapshot> {
    let attempts = config.attempts.max(1);
    for attempt in 1..=attempts {
        let snapshot = task::task_status(transport, api_base, task_id).await?;
        on_update(&snapshot);
        debug!(
            "task {} status {} (attempt {}/{})",
            task_id, snapshot.status, attempt, attempts
        );

        match snapshot.status.class() {
            StatusClass::Success => {
                info!("task {} finished with {} work(s)", task_id, snapshot.works.len());
                return Ok(snapshot);
            }
            StatusClass::Failed => {
                return Err(Error::JobFailed {
                    task_id,
                    status: snapshot.status,
                    message: snapshot.message,
                });
            }
            StatusClass::NotFound => return Err(Error::TaskNotFound { task_id }),
            StatusClass::Processing => {}
        }

        if cancel.is_cancelled() {
            debug!("tracking of task {task_id} detached");
            return Err(Error::Cancelled { task_id });
        }
        if attempt < attempts {
            tokio::time::sleep(config.interval).await;
        }
    }

    warn!("gave up on task {task_id} after {attempts} status checks");
    Err(Error::PollExhausted { task_id, attempts })
}
