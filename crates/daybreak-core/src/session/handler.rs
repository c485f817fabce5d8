//! Session handler trait.
//!
//! The command layer implements this to consume the next message of a user
//! who is mid-flow. Handlers own their business rules: "task not found" and
//! similar outcomes are ordinary `Ok` reply strings. An `Err` means the
//! handler itself broke and triggers the generic state-reset reply.

use daybreak_types::error::HandlerError;
use daybreak_types::session::{TaskId, UserId};

/// Trait for consuming a session's pending message.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in the dispatch layer, outside this crate.
pub trait SessionHandler: Send + Sync {
    /// The user sent the text of a new to-do task.
    fn handle_task_add(
        &self,
        user: UserId,
        text: &str,
    ) -> impl std::future::Future<Output = Result<String, HandlerError>> + Send;

    /// The user sent replacement text for the task they are editing.
    fn handle_task_edit(
        &self,
        user: UserId,
        task: TaskId,
        text: &str,
    ) -> impl std::future::Future<Output = Result<String, HandlerError>> + Send;

    /// The user sent the text of a new wishlist item.
    fn handle_wish_add(
        &self,
        user: UserId,
        text: &str,
    ) -> impl std::future::Future<Output = Result<String, HandlerError>> + Send;

    /// The user sent a city name for their profile.
    fn handle_city_selection(
        &self,
        user: UserId,
        text: &str,
    ) -> impl std::future::Future<Output = Result<String, HandlerError>> + Send;
}
