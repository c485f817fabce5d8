//! The concrete job actions: nightly cleanup, morning newsletter, task
//! reminders, and the session expiry sweep.
//!
//! Each builder captures its collaborators and returns a [`JobAction`]
//! closure the scheduler can fire any number of times. Actions follow one
//! failure policy: stop the run on a records-store error (the scheduler logs
//! it and the schedule survives), but log-and-continue on per-user delivery
//! failures so one blocked user never starves the rest.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use daybreak_types::session::UserId;

use crate::clock::Clock;
use crate::records::RecordsStore;
use crate::sender::MessageSender;
use crate::session::{SessionHandler, SessionStore};
use crate::weather::{ForecastFetcher, ForecastStore, NO_CITY_TEXT, WeatherProvider};

use super::scheduler::JobAction;

/// Nightly records maintenance, in fixed order: stats retention, stats
/// snapshot, daily-task purge, wishlist purge. The first failure aborts the
/// run.
pub fn cleanup_action<R>(records: Arc<R>) -> JobAction
where
    R: RecordsStore + 'static,
{
    Arc::new(move || {
        let records = records.clone();
        Box::pin(async move {
            records.cleanup_old_stats().await.context("cleanup_old_stats")?;
            records
                .save_all_active_user_stats()
                .await
                .context("save_all_active_user_stats")?;
            records.purge_daily_tasks().await.context("purge_daily_tasks")?;
            records
                .purge_unlocked_wishlist_items()
                .await
                .context("purge_unlocked_wishlist_items")?;
            info!("nightly cleanup finished");
            Ok(())
        })
    })
}

/// Morning newsletter: one forecast per city, one message per user.
///
/// Users are grouped by their stored city (trimmed); users without one form
/// their own group and get the no-city nudge instead of a forecast. The
/// forecast cache makes the per-group fetch effectively once per city per
/// day.
pub fn newsletter_action<C, R, M, F, S>(
    zone: Tz,
    clock: C,
    records: Arc<R>,
    weather: Arc<WeatherProvider<C, F, S>>,
    sender: Arc<M>,
) -> JobAction
where
    C: Clock + Clone + 'static,
    R: RecordsStore + 'static,
    M: MessageSender + 'static,
    F: ForecastFetcher + 'static,
    S: ForecastStore + 'static,
{
    Arc::new(move || {
        let clock = clock.clone();
        let records = records.clone();
        let weather = weather.clone();
        let sender = sender.clone();
        Box::pin(async move {
            let users = records.all_user_ids().await.context("all_user_ids")?;

            let mut groups: HashMap<String, Vec<UserId>> = HashMap::new();
            for user in users {
                match records.user_city(user).await {
                    Ok(city) => {
                        let city = city.unwrap_or_default().trim().to_string();
                        groups.entry(city).or_default().push(user);
                    }
                    Err(err) => warn!(%user, error = %err, "city lookup failed; user skipped"),
                }
            }

            let date_line = clock
                .now_utc()
                .with_timezone(&zone)
                .format("%A, %-d %B")
                .to_string();

            let mut sent = 0usize;
            let mut failed = 0usize;
            for (city, users) in groups {
                let weather_text = if city.is_empty() {
                    NO_CITY_TEXT.to_string()
                } else {
                    weather.today_forecast(&city).await
                };
                let message = newsletter_text(&date_line, &weather_text);
                for user in users {
                    match sender.send_text(user, &message).await {
                        Ok(()) => sent += 1,
                        Err(err) => {
                            failed += 1;
                            warn!(%user, error = %err, "newsletter delivery failed");
                        }
                    }
                }
            }

            info!(sent, failed, "morning newsletter delivered");
            Ok(())
        })
    })
}

/// Pre-cleanup nudge for users who still have unfinished tasks.
pub fn reminder_action<R, M>(records: Arc<R>, sender: Arc<M>, lead_minutes: u32) -> JobAction
where
    R: RecordsStore + 'static,
    M: MessageSender + 'static,
{
    Arc::new(move || {
        let records = records.clone();
        let sender = sender.clone();
        Box::pin(async move {
            let users = records
                .users_with_incomplete_tasks()
                .await
                .context("users_with_incomplete_tasks")?;
            if users.is_empty() {
                debug!(lead_minutes, "no users with unfinished tasks");
                return Ok(());
            }

            let text = reminder_text(lead_minutes);
            let mut sent = 0usize;
            for user in users {
                match sender.send_text(user, &text).await {
                    Ok(()) => sent += 1,
                    Err(err) => warn!(%user, error = %err, "reminder delivery failed"),
                }
            }
            info!(lead_minutes, sent, "task reminders delivered");
            Ok(())
        })
    })
}

/// Periodic session expiry sweep.
pub fn sweep_action<C, M, H>(store: Arc<SessionStore<C, M, H>>) -> JobAction
where
    C: Clock + 'static,
    M: MessageSender + 'static,
    H: SessionHandler + 'static,
{
    Arc::new(move || {
        let store = store.clone();
        Box::pin(async move {
            store.run_expiry_sweep().await;
            Ok(())
        })
    })
}

fn newsletter_text(date_line: &str, weather: &str) -> String {
    format!(
        "☀️ Good morning!\n\n📅 Today is {date_line}.\n\n{weather}\n\n\
         📝 Don't forget to refresh your to-do list for today! /menu"
    )
}

fn reminder_text(lead_minutes: u32) -> String {
    match lead_minutes {
        60 => "⏰ One hour left! Unfinished tasks will be cleared during the nightly cleanup."
            .to_string(),
        5 => "🔥 5 minutes left! Wrap up your tasks before the nightly cleanup.".to_string(),
        n => format!("⏳ {n} minutes left before the nightly cleanup. Time to wrap up!"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    use std::sync::Mutex;
    use std::time::Duration as StdDuration;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use daybreak_types::error::{HandlerError, RecordsError, SendError};
    use daybreak_types::session::TaskId;
    use daybreak_types::weather::ForecastSample;

    // -------------------------------------------------------------------
    // Test doubles
    // -------------------------------------------------------------------

    #[derive(Clone, Default)]
    struct ScriptedRecords {
        ops: Arc<Mutex<Vec<&'static str>>>,
        fail_on: Option<&'static str>,
        users: Vec<(UserId, Option<String>)>,
        busy_users: Vec<UserId>,
    }

    impl ScriptedRecords {
        fn run(&self, op: &'static str) -> Result<(), RecordsError> {
            self.ops.lock().unwrap().push(op);
            if self.fail_on == Some(op) {
                return Err(RecordsError::Query(format!("{op} went sideways")));
            }
            Ok(())
        }

        fn ops(&self) -> Vec<&'static str> {
            self.ops.lock().unwrap().clone()
        }
    }

    impl RecordsStore for ScriptedRecords {
        async fn cleanup_old_stats(&self) -> Result<(), RecordsError> {
            self.run("cleanup_old_stats")
        }

        async fn save_all_active_user_stats(&self) -> Result<(), RecordsError> {
            self.run("save_all_active_user_stats")
        }

        async fn purge_daily_tasks(&self) -> Result<(), RecordsError> {
            self.run("purge_daily_tasks")
        }

        async fn purge_unlocked_wishlist_items(&self) -> Result<(), RecordsError> {
            self.run("purge_unlocked_wishlist_items")
        }

        async fn users_with_incomplete_tasks(&self) -> Result<Vec<UserId>, RecordsError> {
            Ok(self.busy_users.clone())
        }

        async fn all_user_ids(&self) -> Result<Vec<UserId>, RecordsError> {
            Ok(self.users.iter().map(|(user, _)| *user).collect())
        }

        async fn user_city(&self, user: UserId) -> Result<Option<String>, RecordsError> {
            Ok(self
                .users
                .iter()
                .find(|(candidate, _)| *candidate == user)
                .and_then(|(_, city)| city.clone()))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSender {
        sent: Arc<Mutex<Vec<(UserId, String)>>>,
        fail_for: Option<UserId>,
    }

    impl RecordingSender {
        fn sent(&self) -> Vec<(UserId, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl MessageSender for RecordingSender {
        async fn send_text(&self, user: UserId, text: &str) -> Result<(), SendError> {
            if self.fail_for == Some(user) {
                return Err(SendError::Blocked);
            }
            self.sent.lock().unwrap().push((user, text.to_string()));
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct NopHandler;

    impl SessionHandler for NopHandler {
        async fn handle_task_add(&self, _user: UserId, _text: &str) -> Result<String, HandlerError> {
            Ok(String::new())
        }

        async fn handle_task_edit(
            &self,
            _user: UserId,
            _task: TaskId,
            _text: &str,
        ) -> Result<String, HandlerError> {
            Ok(String::new())
        }

        async fn handle_wish_add(&self, _user: UserId, _text: &str) -> Result<String, HandlerError> {
            Ok(String::new())
        }

        async fn handle_city_selection(
            &self,
            _user: UserId,
            _text: &str,
        ) -> Result<String, HandlerError> {
            Ok(String::new())
        }
    }

    use daybreak_types::error::StoreError;
    use daybreak_types::weather::CachedForecast;

    #[derive(Clone, Default)]
    struct MemStore {
        entries: Arc<Mutex<HashMap<String, CachedForecast>>>,
    }

    impl ForecastStore for MemStore {
        async fn get(&self, key: &str) -> Result<Option<CachedForecast>, StoreError> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn save(&self, key: &str, entry: &CachedForecast) -> Result<(), StoreError> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), entry.clone());
            Ok(())
        }

        async fn remove_expired(&self, today: chrono::NaiveDate) -> Result<(), StoreError> {
            self.entries
                .lock()
                .unwrap()
                .retain(|_, entry| entry.is_valid_on(today));
            Ok(())
        }
    }

    #[derive(Clone)]
    struct CountingFetcher {
        samples: Vec<ForecastSample>,
        calls: Arc<Mutex<usize>>,
    }

    impl CountingFetcher {
        fn new(samples: Vec<ForecastSample>) -> Self {
            Self {
                samples,
                calls: Arc::new(Mutex::new(0)),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl ForecastFetcher for CountingFetcher {
        async fn fetch_raw(
            &self,
            _city: &str,
        ) -> Result<Vec<ForecastSample>, daybreak_types::error::FetchError> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.samples.clone())
        }
    }

    fn zone() -> Tz {
        chrono_tz::Asia::Yekaterinburg
    }

    fn morning() -> DateTime<Utc> {
        // Saturday 2024-06-01, 07:00 local.
        zone()
            .with_ymd_and_hms(2024, 6, 1, 7, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn rainy_samples() -> Vec<ForecastSample> {
        vec![
            ForecastSample::new(
                zone()
                    .with_ymd_and_hms(2024, 6, 1, 9, 0, 0)
                    .unwrap()
                    .with_timezone(&Utc),
                5.2,
                Some("light rain".to_string()),
            ),
            ForecastSample::new(
                zone()
                    .with_ymd_and_hms(2024, 6, 1, 15, 0, 0)
                    .unwrap()
                    .with_timezone(&Utc),
                3.8,
                Some("light rain".to_string()),
            ),
        ]
    }

    // -------------------------------------------------------------------
    // Cleanup
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn test_cleanup_runs_operations_in_order() {
        let records = ScriptedRecords::default();
        let action = cleanup_action(Arc::new(records.clone()));

        action().await.unwrap();

        assert_eq!(
            records.ops(),
            vec![
                "cleanup_old_stats",
                "save_all_active_user_stats",
                "purge_daily_tasks",
                "purge_unlocked_wishlist_items",
            ]
        );
    }

    #[tokio::test]
    async fn test_cleanup_stops_at_first_failure() {
        let records = ScriptedRecords {
            fail_on: Some("save_all_active_user_stats"),
            ..ScriptedRecords::default()
        };
        let action = cleanup_action(Arc::new(records.clone()));

        let err = action().await.unwrap_err();
        assert!(format!("{err:?}").contains("save_all_active_user_stats"));
        assert_eq!(records.ops(), vec!["cleanup_old_stats", "save_all_active_user_stats"]);
    }

    // -------------------------------------------------------------------
    // Newsletter
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn test_newsletter_groups_by_city_and_fetches_once() {
        let records = ScriptedRecords {
            users: vec![
                (UserId(1), Some("Perm".to_string())),
                (UserId(2), Some(" perm ".to_string())),
                (UserId(3), None),
                (UserId(4), Some("   ".to_string())),
            ],
            ..ScriptedRecords::default()
        };
        let sender = RecordingSender::default();
        let fetcher = CountingFetcher::new(rainy_samples());
        let clock = ManualClock::new(morning());
        let weather = Arc::new(WeatherProvider::new(
            zone(),
            clock.clone(),
            fetcher.clone(),
            MemStore::default(),
        ));

        let action = newsletter_action(
            zone(),
            clock,
            Arc::new(records),
            weather,
            Arc::new(sender.clone()),
        );
        action().await.unwrap();

        let sent = sender.sent();
        assert_eq!(sent.len(), 4);
        // One upstream call despite two spellings of the same city.
        assert_eq!(fetcher.calls(), 1);

        let text_for = |user: UserId| {
            sent.iter()
                .find(|(recipient, _)| *recipient == user)
                .map(|(_, text)| text.clone())
                .unwrap()
        };
        assert!(text_for(UserId(1)).contains("Light rain"));
        assert!(text_for(UserId(2)).contains("Light rain"));
        assert!(text_for(UserId(3)).contains(NO_CITY_TEXT));
        assert!(text_for(UserId(4)).contains(NO_CITY_TEXT));

        let message = text_for(UserId(1));
        assert!(message.starts_with("☀️ Good morning!"));
        assert!(message.contains("Saturday, 1 June"), "got: {message}");
        assert!(message.contains("/menu"));
    }

    #[tokio::test]
    async fn test_newsletter_continues_after_send_failure() {
        let records = ScriptedRecords {
            users: vec![
                (UserId(1), Some("Perm".to_string())),
                (UserId(2), Some("Perm".to_string())),
            ],
            ..ScriptedRecords::default()
        };
        let sender = RecordingSender {
            fail_for: Some(UserId(1)),
            ..RecordingSender::default()
        };
        let clock = ManualClock::new(morning());
        let weather = Arc::new(WeatherProvider::new(
            zone(),
            clock.clone(),
            CountingFetcher::new(rainy_samples()),
            MemStore::default(),
        ));

        let action = newsletter_action(
            zone(),
            clock,
            Arc::new(records),
            weather,
            Arc::new(sender.clone()),
        );
        action().await.unwrap();

        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, UserId(2));
    }

    // -------------------------------------------------------------------
    // Reminders
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn test_reminder_sends_to_busy_users() {
        let records = ScriptedRecords {
            busy_users: vec![UserId(1), UserId(2)],
            ..ScriptedRecords::default()
        };
        let sender = RecordingSender::default();

        let action = reminder_action(Arc::new(records), Arc::new(sender.clone()), 60);
        action().await.unwrap();

        let sent = sender.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].1.contains("One hour left"));
    }

    #[tokio::test]
    async fn test_reminder_with_no_busy_users_sends_nothing() {
        let records = ScriptedRecords::default();
        let sender = RecordingSender::default();

        let action = reminder_action(Arc::new(records), Arc::new(sender.clone()), 5);
        action().await.unwrap();

        assert!(sender.sent().is_empty());
    }

    #[test]
    fn test_reminder_text_variants() {
        assert!(reminder_text(60).contains("One hour left"));
        assert!(reminder_text(5).contains("5 minutes left"));
        assert!(reminder_text(25).contains("25 minutes left"));
    }

    // -------------------------------------------------------------------
    // Sweep
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn test_sweep_action_evicts_expired_sessions() {
        let clock = ManualClock::new(morning());
        let store = Arc::new(SessionStore::new(
            StdDuration::from_secs(10),
            clock.clone(),
            RecordingSender::default(),
            NopHandler,
        ));

        store.start_adding_task(UserId(42));
        clock.advance(Duration::seconds(65));

        let action = sweep_action(store.clone());
        action().await.unwrap();

        assert!(!store.has_session(UserId(42)));
    }
}
