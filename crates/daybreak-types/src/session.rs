//! Per-user interactive session types.
//!
//! A session records what a user is currently doing in a multi-step flow
//! (adding a task, editing a task, adding a wish, picking a city). Sessions
//! are memory-only and short-lived; they are never persisted.

use chrono::{DateTime, Duration, Utc};

use std::fmt;

/// Unique identifier for a user, as assigned by the conversational transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a to-do task in the records store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub i64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the user is currently doing.
///
/// Only task editing carries a payload: the id of the task being edited.
/// The other flows need nothing beyond the next message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Waiting for the text of a new to-do task.
    AddingTask,
    /// Waiting for the replacement text of an existing task.
    EditingTask { task: TaskId },
    /// Waiting for the text of a new wishlist item.
    AddingWish,
    /// Waiting for a city name to attach to the user's profile.
    SelectingCity,
}

impl SessionKind {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            SessionKind::AddingTask => "adding-task",
            SessionKind::EditingTask { .. } => "editing-task",
            SessionKind::AddingWish => "adding-wish",
            SessionKind::SelectingCity => "selecting-city",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// An active session for one user.
///
/// `started_at` is stamped exactly once when the session starts and never
/// mutated; expiry is always measured against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub kind: SessionKind,
    pub started_at: DateTime<Utc>,
}

impl UserSession {
    pub fn new(kind: SessionKind, started_at: DateTime<Utc>) -> Self {
        Self { kind, started_at }
    }

    /// Age of the session at `now`. Negative if `now` precedes the start
    /// (a clock moved backwards); callers treat that as not expired.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.started_at)
    }
}
