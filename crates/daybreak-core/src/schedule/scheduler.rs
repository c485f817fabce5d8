//! Job scheduler built on raw tokio timers.
//!
//! Provides:
//! - Daily jobs anchored to a wall-clock time in a configured timezone
//! - Fixed-interval jobs
//! - Self-rearming loops that recompute the next delay after every fire
//! - Manual triggering by job name
//! - Bounded graceful shutdown (wait, then abort stragglers)
//!
//! There is no cron layer: every registered job owns a tokio task that sleeps
//! until its next occurrence, runs the action, then recomputes the following
//! occurrence from the current clock reading. Recomputing from "now" each
//! time means drift, slow actions, and host clock adjustments shift the next
//! run instead of accumulating error.

use std::fmt;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, LocalResult, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from manual scheduler operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// No job is registered under that name.
    #[error("job '{0}' not registered")]
    JobNotFound(String),

    /// A manually triggered run returned an error.
    #[error("job '{name}' failed: {source}")]
    JobFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

// ---------------------------------------------------------------------------
// Job definition
// ---------------------------------------------------------------------------

/// Action invoked each time a job fires.
pub type JobAction =
    Arc<dyn Fn() -> futures_util::future::BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// When a job fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSchedule {
    /// Once per day at this wall-clock time in the scheduler's timezone.
    DailyAt(NaiveTime),
    /// On a fixed period; the first fire is one period after registration,
    /// and each later period is measured from the end of the previous run.
    Every(StdDuration),
}

/// A named unit of scheduled work.
pub struct Job {
    name: String,
    schedule: JobSchedule,
    action: JobAction,
}

impl Job {
    /// A job firing daily at `at` (scheduler's timezone).
    pub fn daily(name: impl Into<String>, at: NaiveTime, action: JobAction) -> Self {
        Self {
            name: name.into(),
            schedule: JobSchedule::DailyAt(at),
            action,
        }
    }

    /// A job firing every `period`.
    pub fn every(name: impl Into<String>, period: StdDuration, action: JobAction) -> Self {
        Self {
            name: name.into(),
            schedule: JobSchedule::Every(period),
            action,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("schedule", &self.schedule)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Delay computation
// ---------------------------------------------------------------------------

/// Time until the next occurrence of `target` wall-clock time in `zone`,
/// seen from `now`.
///
/// The target is resolved against today's local date first; if that instant
/// has already passed (or is exactly now), the same wall-clock time on the
/// next day is used. A target that falls in a DST gap rolls to the next day
/// it exists; an ambiguous target (clocks rolled back) resolves to its
/// earliest occurrence.
pub fn delay_until_next(now: DateTime<Utc>, zone: Tz, target: NaiveTime) -> StdDuration {
    let local_now = now.with_timezone(&zone);
    let mut date = local_now.date_naive();

    // Two iterations suffice outside pathological zones; three is headroom
    // for a gap landing exactly on the rollover day.
    for _ in 0..3 {
        match zone.from_local_datetime(&date.and_time(target)) {
            LocalResult::Single(at) | LocalResult::Ambiguous(at, _) => {
                let at = at.with_timezone(&Utc);
                if at > now {
                    return (at - now).to_std().unwrap_or(StdDuration::ZERO);
                }
            }
            LocalResult::None => {}
        }
        date = date.succ_opt().unwrap_or(date);
    }

    StdDuration::from_secs(24 * 60 * 60)
}

// ---------------------------------------------------------------------------
// JobScheduler
// ---------------------------------------------------------------------------

struct RegisteredJob {
    action: JobAction,
    handle: JoinHandle<()>,
}

/// Registry of named repeating jobs, each driven by its own tokio task.
///
/// Cheap to share behind an `Arc`; all operations take `&self`.
pub struct JobScheduler<C: Clock + Clone + 'static> {
    zone: Tz,
    clock: C,
    jobs: DashMap<String, RegisteredJob>,
    shutdown: CancellationToken,
}

impl<C: Clock + Clone + 'static> JobScheduler<C> {
    pub fn new(zone: Tz, clock: C) -> Self {
        Self {
            zone,
            clock,
            jobs: DashMap::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Register `job` and start its timer loop immediately.
    ///
    /// Registering a second job under the same name replaces the first and
    /// stops its loop. Must be called from within a tokio runtime.
    pub fn schedule(&self, job: Job) {
        let Job {
            name,
            schedule,
            action,
        } = job;

        let token = self.shutdown.clone();
        let zone = self.zone;
        let clock = self.clock.clone();
        let loop_name = name.clone();
        let loop_action = action.clone();

        let handle = tokio::spawn(async move {
            loop {
                let delay = match schedule {
                    JobSchedule::DailyAt(target) => delay_until_next(clock.now_utc(), zone, target),
                    JobSchedule::Every(period) => period,
                };
                tracing::debug!(job = %loop_name, delay_secs = delay.as_secs(), "job armed");

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {
                        if let Err(err) = (loop_action)().await {
                            tracing::warn!(job = %loop_name, error = %err, "scheduled run failed");
                        }
                    }
                }
            }
        });

        if let Some(previous) = self.jobs.insert(name.clone(), RegisteredJob { action, handle }) {
            previous.handle.abort();
            tracing::warn!(job = %name, "replaced an already registered job");
        }
        tracing::info!(job = %name, "job scheduled");
    }

    /// Run a registered job's action once, outside its schedule.
    ///
    /// The timer loop is unaffected; its next occurrence stays where it was.
    pub async fn run_now(&self, name: &str) -> Result<(), SchedulerError> {
        let action = {
            let entry = self
                .jobs
                .get(name)
                .ok_or_else(|| SchedulerError::JobNotFound(name.to_string()))?;
            entry.action.clone()
        };
        tracing::info!(job = %name, "manual run requested");
        action().await.map_err(|source| SchedulerError::JobFailed {
            name: name.to_string(),
            source,
        })
    }

    /// Number of registered jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Stop all timer loops, waiting up to `grace` for in-flight actions.
    ///
    /// Idle loops exit at once via the cancellation token; a loop still
    /// running its action gets until the grace deadline, then is aborted.
    /// Idempotent.
    pub async fn shutdown(&self, grace: StdDuration) {
        if self.shutdown.is_cancelled() {
            return;
        }
        tracing::info!(jobs = self.jobs.len(), "scheduler shutting down");
        self.shutdown.cancel();

        let names: Vec<String> = self.jobs.iter().map(|entry| entry.key().clone()).collect();
        let mut handles = Vec::new();
        let mut aborts = Vec::new();
        for name in names {
            if let Some((_, job)) = self.jobs.remove(&name) {
                aborts.push(job.handle.abort_handle());
                handles.push(job.handle);
            }
        }
        if handles.is_empty() {
            return;
        }

        let drained = tokio::time::timeout(grace, futures_util::future::join_all(handles)).await;
        if drained.is_err() {
            tracing::warn!("grace period elapsed; aborting remaining job tasks");
            for abort in aborts {
                abort.abort();
            }
        }
        tracing::info!("scheduler stopped");
    }
}

impl<C: Clock + Clone + 'static> fmt::Debug for JobScheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobScheduler")
            .field("zone", &self.zone)
            .field("jobs", &self.jobs.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
