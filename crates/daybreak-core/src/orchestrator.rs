//! Top-level wiring: validate configuration, build the session store and
//! weather provider, and register the daily jobs on the scheduler.
//!
//! Construction is fail-fast: a bad timezone name, schedule time, or reminder
//! lead surfaces as a `ConfigError` before any job is armed. After `start()`
//! the orchestrator is passive; callers reach the session store and weather
//! provider through accessors from their own dispatch path.

use std::fmt;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use tracing::info;

use daybreak_types::config::AppConfig;
use daybreak_types::error::ConfigError;

use crate::clock::Clock;
use crate::records::RecordsStore;
use crate::schedule::{Job, JobScheduler, jobs};
use crate::sender::MessageSender;
use crate::session::{SessionHandler, SessionStore};
use crate::weather::{ForecastFetcher, ForecastStore, WeatherProvider};

/// The assembled service: session store, weather provider, scheduler, and
/// the jobs that connect them.
pub struct Orchestrator<C, R, M, F, S, H>
where
    C: Clock + Clone + 'static,
    R: RecordsStore + 'static,
    M: MessageSender + Clone + 'static,
    F: ForecastFetcher + 'static,
    S: ForecastStore + 'static,
    H: SessionHandler + 'static,
{
    zone: Tz,
    cleanup_at: NaiveTime,
    newsletter_at: NaiveTime,
    reminders: Vec<(u32, NaiveTime)>,
    sweep_interval: StdDuration,
    clock: C,
    records: Arc<R>,
    sender: Arc<M>,
    sessions: Arc<SessionStore<C, M, H>>,
    weather: Arc<WeatherProvider<C, F, S>>,
    scheduler: JobScheduler<C>,
}

impl<C, R, M, F, S, H> Orchestrator<C, R, M, F, S, H>
where
    C: Clock + Clone + 'static,
    R: RecordsStore + 'static,
    M: MessageSender + Clone + 'static,
    F: ForecastFetcher + 'static,
    S: ForecastStore + 'static,
    H: SessionHandler + 'static,
{
    /// Validate `config` and wire the components. No job runs yet.
    pub fn new(
        config: &AppConfig,
        clock: C,
        records: R,
        sender: M,
        fetcher: F,
        forecast_store: S,
        handler: H,
    ) -> Result<Self, ConfigError> {
        let zone = config.zone()?;
        let cleanup_at = config.schedule.cleanup_time()?;
        let newsletter_at = config.schedule.newsletter_time()?;
        let reminders = config.schedule.reminder_times()?;

        let sessions = Arc::new(SessionStore::new(
            config.session.timeout(),
            clock.clone(),
            sender.clone(),
            handler,
        ));
        let weather = Arc::new(WeatherProvider::new(
            zone,
            clock.clone(),
            fetcher,
            forecast_store,
        ));
        let scheduler = JobScheduler::new(zone, clock.clone());

        Ok(Self {
            zone,
            cleanup_at,
            newsletter_at,
            reminders,
            sweep_interval: config.session.sweep_interval(),
            clock,
            records: Arc::new(records),
            sender: Arc::new(sender),
            sessions,
            weather,
            scheduler,
        })
    }

    /// Arm every job. Must be called from within a tokio runtime.
    pub fn start(&self) {
        self.scheduler.schedule(Job::daily(
            "daily-cleanup",
            self.cleanup_at,
            jobs::cleanup_action(self.records.clone()),
        ));

        self.scheduler.schedule(Job::daily(
            "morning-newsletter",
            self.newsletter_at,
            jobs::newsletter_action(
                self.zone,
                self.clock.clone(),
                self.records.clone(),
                self.weather.clone(),
                self.sender.clone(),
            ),
        ));

        for (lead, at) in &self.reminders {
            self.scheduler.schedule(Job::daily(
                format!("task-reminder-{lead}m"),
                *at,
                jobs::reminder_action(self.records.clone(), self.sender.clone(), *lead),
            ));
        }

        self.scheduler.schedule(Job::every(
            "session-sweep",
            self.sweep_interval,
            jobs::sweep_action(self.sessions.clone()),
        ));

        info!(
            jobs = self.scheduler.job_count(),
            timezone = %self.zone,
            "orchestrator started"
        );
    }

    pub fn sessions(&self) -> &SessionStore<C, M, H> {
        &self.sessions
    }

    pub fn weather(&self) -> &WeatherProvider<C, F, S> {
        &self.weather
    }

    pub fn scheduler(&self) -> &JobScheduler<C> {
        &self.scheduler
    }

    /// Stop all jobs, waiting up to `grace` for in-flight runs.
    pub async fn shutdown(&self, grace: StdDuration) {
        self.scheduler.shutdown(grace).await;
        info!("orchestrator stopped");
    }
}

impl<C, R, M, F, S, H> fmt::Debug for Orchestrator<C, R, M, F, S, H>
where
    C: Clock + Clone + 'static,
    R: RecordsStore + 'static,
    M: MessageSender + Clone + 'static,
    F: ForecastFetcher + 'static,
    S: ForecastStore + 'static,
    H: SessionHandler + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("zone", &self.zone)
            .field("cleanup_at", &self.cleanup_at)
            .field("newsletter_at", &self.newsletter_at)
            .field("reminders", &self.reminders)
            .field("jobs", &self.scheduler.job_count())
            .finish()
    }
}
