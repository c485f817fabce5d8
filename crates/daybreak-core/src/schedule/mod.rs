//! Timezone-aware job scheduling: the self-rearming scheduler and the
//! concrete job actions the orchestrator registers on it.

pub mod jobs;
pub mod scheduler;

pub use scheduler::{Job, JobAction, JobSchedule, JobScheduler, SchedulerError, delay_until_next};
