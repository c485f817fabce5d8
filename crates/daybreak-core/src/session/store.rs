//! Session store: the per-user state map, dispatch pipeline, and expiry sweep.
//!
//! One `DashMap` entry per user holds both the session kind and its start
//! timestamp, so every removal is atomic as a unit -- there is no separate
//! timestamp map that could be observed half-cancelled. Dispatch consumes the
//! entry *before* invoking the handler, which makes exactly-once clearing
//! unconditional: no handler outcome can re-arm or leak a session.

use std::fmt;
use std::time::Duration as StdDuration;

use chrono::Duration;
use dashmap::DashMap;
use tracing::{debug, error, info, warn};

use daybreak_types::session::{SessionKind, TaskId, UserId, UserSession};

use crate::clock::Clock;
use crate::sender::MessageSender;

use super::handler::SessionHandler;

/// Reply for an explicit cancel keyword.
const CANCELLED_REPLY: &str = "❌ Action cancelled.";

/// Reply for a menu keyword.
const MENU_REPLY: &str = "🏠 Back to the main menu.";

/// Reply shown when a handler fails unexpectedly.
const STATE_RESET_REPLY: &str =
    "⚠️ Something went wrong while handling your reply. The current action was reset.";

/// What `dispatch` did with the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No keyword matched and no session exists; the caller should not have
    /// routed the message here.
    NoSession,
    /// The message was a cancel keyword; any session is gone.
    Cancelled,
    /// The message was a menu keyword; any session is gone.
    MenuRequested,
    /// The session's handler consumed the message and produced this reply.
    Handled(String),
    /// The handler failed; the session is cleared anyway.
    Failed,
}

impl DispatchOutcome {
    /// The text to show the user, if any.
    pub fn reply(&self) -> Option<&str> {
        match self {
            DispatchOutcome::NoSession => None,
            DispatchOutcome::Cancelled => Some(CANCELLED_REPLY),
            DispatchOutcome::MenuRequested => Some(MENU_REPLY),
            DispatchOutcome::Handled(reply) => Some(reply),
            DispatchOutcome::Failed => Some(STATE_RESET_REPLY),
        }
    }
}

/// Which escape keyword a message matched.
enum EscapeKeyword {
    Cancel,
    Menu,
}

/// Case-insensitive match against the cancel/menu keywords, after trimming.
fn match_escape_keyword(text: &str) -> Option<EscapeKeyword> {
    let normalized = text.trim().to_lowercase();
    match normalized.as_str() {
        "cancel" => Some(EscapeKeyword::Cancel),
        "menu" | "main menu" | "/menu" => Some(EscapeKeyword::Menu),
        _ => None,
    }
}

/// Concurrent per-user session store.
///
/// Owns the session map exclusively; nothing else mutates it. Safe for
/// concurrent start/query/cancel/dispatch from any number of inbound-message
/// tasks plus the periodic sweep -- entries for different users never contend
/// on a shared lock.
pub struct SessionStore<C: Clock, M: MessageSender, H: SessionHandler> {
    sessions: DashMap<UserId, UserSession>,
    /// Maximum session age before the sweep may evict it.
    timeout: Duration,
    /// Pushed to a user whose session the sweep evicted.
    timeout_notice: String,
    clock: C,
    sender: M,
    handler: H,
}

impl<C: Clock, M: MessageSender, H: SessionHandler> SessionStore<C, M, H> {
    /// Create a new store with the given session timeout.
    pub fn new(timeout: StdDuration, clock: C, sender: M, handler: H) -> Self {
        let timeout_notice = format!(
            "⏰ You didn't reply within {} seconds, so the action was cancelled. \
             Open the menu to start again.",
            timeout.as_secs()
        );
        Self {
            sessions: DashMap::new(),
            timeout: Duration::from_std(timeout).unwrap_or(Duration::MAX),
            timeout_notice,
            clock,
            sender,
            handler,
        }
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Wait for the text of a new to-do task.
    pub fn start_adding_task(&self, user: UserId) {
        self.start(user, SessionKind::AddingTask);
    }

    /// Wait for replacement text for `task`.
    pub fn start_editing_task(&self, user: UserId, task: TaskId) {
        self.start(user, SessionKind::EditingTask { task });
    }

    /// Wait for the text of a new wishlist item.
    pub fn start_adding_wish(&self, user: UserId) {
        self.start(user, SessionKind::AddingWish);
    }

    /// Wait for a city name.
    pub fn start_selecting_city(&self, user: UserId) {
        self.start(user, SessionKind::SelectingCity);
    }

    fn start(&self, user: UserId, kind: SessionKind) {
        let session = UserSession::new(kind, self.clock.now_utc());
        debug!(%user, kind = %session.kind, "session started");
        // Last writer wins: any previous unfinished flow is silently dropped.
        self.sessions.insert(user, session);
    }

    /// True iff a session exists, expired or not.
    pub fn has_session(&self, user: UserId) -> bool {
        self.sessions.contains_key(&user)
    }

    /// True if no session exists, or the session is older than the timeout.
    /// Absence counts as expired so call sites fail safe.
    pub fn is_expired(&self, user: UserId) -> bool {
        match self.sessions.get(&user) {
            Some(session) => session.age(self.clock.now_utc()) > self.timeout,
            None => true,
        }
    }

    /// Remove any session for `user`. Idempotent.
    pub fn cancel(&self, user: UserId) {
        if self.sessions.remove(&user).is_some() {
            debug!(%user, "session cancelled");
        }
    }

    /// Number of live sessions (expired ones the sweep has not reached yet
    /// included).
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Consume a mid-flow user's message.
    ///
    /// Keyword check first (a stray "cancel" with no session still gets its
    /// acknowledgement), then the session is removed *before* the handler
    /// runs. Every path out of here leaves the user session-free.
    pub async fn dispatch(&self, user: UserId, text: &str) -> DispatchOutcome {
        if let Some(keyword) = match_escape_keyword(text) {
            self.cancel(user);
            return match keyword {
                EscapeKeyword::Cancel => DispatchOutcome::Cancelled,
                EscapeKeyword::Menu => DispatchOutcome::MenuRequested,
            };
        }

        let Some((_, session)) = self.sessions.remove(&user) else {
            return DispatchOutcome::NoSession;
        };

        let result = match session.kind {
            SessionKind::AddingTask => self.handler.handle_task_add(user, text).await,
            SessionKind::EditingTask { task } => {
                self.handler.handle_task_edit(user, task, text).await
            }
            SessionKind::AddingWish => self.handler.handle_wish_add(user, text).await,
            SessionKind::SelectingCity => self.handler.handle_city_selection(user, text).await,
        };

        match result {
            Ok(reply) => DispatchOutcome::Handled(reply),
            Err(err) => {
                error!(%user, kind = session.kind.label(), error = %err, "session handler failed");
                DispatchOutcome::Failed
            }
        }
    }

    // -----------------------------------------------------------------------
    // Expiry sweep
    // -----------------------------------------------------------------------

    /// Evict every session older than the timeout and notify its user once.
    ///
    /// The scan collects candidates without holding map locks, then removes
    /// each under its entry lock with the age re-checked, so a session
    /// restarted between scan and removal survives. One user's failed
    /// notification never aborts the sweep for the rest.
    pub async fn run_expiry_sweep(&self) {
        let now = self.clock.now_utc();
        let candidates: Vec<UserId> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().age(now) > self.timeout)
            .map(|entry| *entry.key())
            .collect();

        let mut notified = 0usize;
        for user in candidates {
            let removed = self
                .sessions
                .remove_if(&user, |_, session| session.age(now) > self.timeout)
                .is_some();
            if !removed {
                // A dispatch consumed it or a restart refreshed it; either
                // way it is no longer ours to expire.
                continue;
            }
            debug!(%user, "expired session evicted");
            match self.sender.send_text(user, &self.timeout_notice).await {
                Ok(()) => notified += 1,
                Err(err) => warn!(%user, error = %err, "failed to deliver timeout notice"),
            }
        }

        if notified > 0 {
            info!(count = notified, "expiry sweep notified users");
        }
    }
}

impl<C: Clock, M: MessageSender, H: SessionHandler> fmt::Debug for SessionStore<C, M, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}
