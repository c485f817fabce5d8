//! Message sender trait.
//!
//! Defines the interface to the conversational transport. The transport
//! itself (chat API, formatting, keyboards) is out of this crate's scope.

use daybreak_types::error::SendError;
use daybreak_types::session::UserId;

/// Trait for pushing a text message to a user.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live outside this crate.
pub trait MessageSender: Send + Sync {
    fn send_text(
        &self,
        user: UserId,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), SendError>> + Send;
}
