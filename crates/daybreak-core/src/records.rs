//! Records store trait.
//!
//! Defines the interface to the assistant's durable user records (stats,
//! daily tasks, wishlist, per-user city). The relational schema and SQL live
//! behind this trait, out of this crate's scope.

use daybreak_types::error::RecordsError;
use daybreak_types::session::UserId;

/// Trait for the durable records backend.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live outside this crate.
pub trait RecordsStore: Send + Sync {
    /// Drop productivity-stat rows older than the retention window.
    fn cleanup_old_stats(
        &self,
    ) -> impl std::future::Future<Output = Result<(), RecordsError>> + Send;

    /// Snapshot today's productivity stats for every active user.
    fn save_all_active_user_stats(
        &self,
    ) -> impl std::future::Future<Output = Result<(), RecordsError>> + Send;

    /// Delete all of today's to-do tasks (completed or not).
    fn purge_daily_tasks(
        &self,
    ) -> impl std::future::Future<Output = Result<(), RecordsError>> + Send;

    /// Delete wishlist items the user never locked in.
    fn purge_unlocked_wishlist_items(
        &self,
    ) -> impl std::future::Future<Output = Result<(), RecordsError>> + Send;

    /// Users who still have unfinished tasks today (reminder audience).
    fn users_with_incomplete_tasks(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<UserId>, RecordsError>> + Send;

    /// Every known user (newsletter audience).
    fn all_user_ids(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<UserId>, RecordsError>> + Send;

    /// The city stored on the user's profile, if any.
    fn user_city(
        &self,
        user: UserId,
    ) -> impl std::future::Future<Output = Result<Option<String>, RecordsError>> + Send;
}
