//! Per-user session state machine with wall-clock timeout expiry.
//!
//! This module owns the only mutable per-user state in the core:
//! - `store` -- `SessionStore` with atomic start/query/cancel/dispatch and
//!   the periodic expiry sweep
//! - `handler` -- `SessionHandler` trait the command layer implements to
//!   consume a user's next message

pub mod handler;
pub mod store;

pub use handler::SessionHandler;
pub use store::{DispatchOutcome, SessionStore};
