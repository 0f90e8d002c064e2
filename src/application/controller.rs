//! Feeding controller.
//!
//! Drives the `FeedTimer` state machine, saves completed feeds into the
//! session store, loads the history and reacts to connectivity changes.
//! The timer is always passed in by the caller.

use chrono::{DateTime, Utc};

use crate::domain::{
    format_elapsed, recent_first, AppError, FeedTimer, FeedingSession, Result, SyncStatus,
    TrackerConfig, Transition,
};
use crate::infrastructure::{Clock, Haptics, SessionStore, PULSE};

use super::sync_service::{LocalOnlySync, RemoteSync, SyncReport, SyncService};

/// Transient message shown to the user after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// Result of pressing save.
#[derive(Debug)]
pub enum SaveOutcome {
    /// Written to the store; the timer was reset and the history reloaded.
    Saved {
        session: FeedingSession,
        history: Vec<FeedingSession>,
    },
    /// Nothing was written and the timer is untouched, so the user can retry.
    Failed { error: AppError },
}

impl SaveOutcome {
    /// Notice to display for this outcome.
    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            Self::Saved { .. } => Notice::Success("Feeding session saved".into()),
            Self::Failed { error } => Notice::Error(format!("Error saving session: {error}")),
        }
    }
}

/// The UI-side controller.
pub struct FeedingController<R = LocalOnlySync> {
    store: Option<SessionStore>,
    sync: Option<SyncService<R>>,
    clock: Box<dyn Clock>,
    haptics: Box<dyn Haptics>,
    settings: TrackerConfig,
}

impl<R: RemoteSync> FeedingController<R> {
    /// Creates a controller. `store` is `None` when storage could not be
    /// opened; the controller then runs without persistence.
    #[must_use]
    pub fn new(
        store: Option<SessionStore>,
        remote: R,
        clock: Box<dyn Clock>,
        haptics: Box<dyn Haptics>,
        settings: TrackerConfig,
    ) -> Self {
        let sync = store
            .clone()
            .map(|store| SyncService::new(store, remote));

        Self {
            store,
            sync,
            clock,
            haptics,
            settings,
        }
    }

    /// Whether sessions are being persisted.
    #[must_use]
    pub const fn has_storage(&self) -> bool {
        self.store.is_some()
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Current timer display, `MM:SS`.
    #[must_use]
    pub fn display(&self, timer: &FeedTimer) -> String {
        format_elapsed(timer.elapsed(self.now()))
    }

    /// The single action button: start when idle, stop when feeding.
    pub fn press_action(&self, timer: &mut FeedTimer) -> Transition {
        let transition = timer.toggle(self.now());
        self.haptics.pulse(PULSE);
        tracing::info!(?transition, "Action pressed");
        transition
    }

    /// Starts a feed.
    ///
    /// # Errors
    /// Returns `InvalidTransition` if one is already running.
    pub fn start(&self, timer: &mut FeedTimer) -> Result<()> {
        timer.start(self.now())?;
        self.haptics.pulse(PULSE);
        tracing::info!("Feed started");
        Ok(())
    }

    /// Stops the running feed and reveals the amount input.
    ///
    /// # Errors
    /// Returns `InvalidTransition` if no feed is running.
    pub fn stop(&self, timer: &mut FeedTimer) -> Result<()> {
        timer.stop(self.now())?;
        self.haptics.pulse(PULSE);
        tracing::info!(elapsed = %self.display(timer), "Feed stopped");
        Ok(())
    }

    /// Moves the amount by `steps` configured steps (negative to decrease).
    pub fn adjust_amount(&self, timer: &mut FeedTimer, steps: i64) -> u32 {
        let delta = steps.saturating_mul(i64::from(self.settings.amount_step_ml));
        let amount = timer.adjust_amount(delta);
        self.haptics.pulse(PULSE);
        amount
    }

    /// Direct numeric amount entry.
    pub fn set_amount(&self, timer: &mut FeedTimer, amount_ml: u32) {
        timer.set_amount(amount_ml);
    }

    /// Saves the stopped feed.
    ///
    /// On success the timer is reset and the history reloaded. On failure the
    /// timer is left exactly as it was.
    pub async fn save(&self, timer: &mut FeedTimer, online: bool) -> SaveOutcome {
        self.haptics.pulse(PULSE);

        match self.insert_completed(timer, online).await {
            Ok(session) => {
                timer.reset();
                tracing::info!(
                    id = session.id,
                    duration_ms = session.duration_ms,
                    amount_ml = session.amount_ml,
                    status = %session.sync_status,
                    "Feeding session saved"
                );

                let history = self.load_history().await.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Failed to reload history");
                    Vec::new()
                });

                SaveOutcome::Saved { session, history }
            }
            Err(error) => {
                tracing::error!(error = %error, "Error saving session");
                SaveOutcome::Failed { error }
            }
        }
    }

    async fn insert_completed(&self, timer: &FeedTimer, online: bool) -> Result<FeedingSession> {
        let session = timer.complete(self.now(), online)?;
        self.store()?.insert(session).await
    }

    /// The most recent sessions, newest first.
    ///
    /// # Errors
    /// Returns error if the store cannot be read.
    pub async fn load_history(&self) -> Result<Vec<FeedingSession>> {
        self.load_recent(self.settings.history_limit).await
    }

    /// At most `limit` sessions, newest first. Empty without a store.
    ///
    /// # Errors
    /// Returns error if the store cannot be read.
    pub async fn load_recent(&self, limit: usize) -> Result<Vec<FeedingSession>> {
        let Some(store) = &self.store else {
            tracing::debug!("No session store, history is empty");
            return Ok(Vec::new());
        };

        Ok(recent_first(store.get_all().await?, limit))
    }

    /// Applies a connectivity signal. Coming online runs the sync routine;
    /// its outcome is returned, failures are only logged.
    pub async fn handle_online_status(&self, online: bool) -> Option<SyncReport> {
        if !online {
            tracing::info!("Offline, new sessions will be saved as pending");
            return None;
        }

        let Some(sync) = &self.sync else {
            tracing::debug!("Online without a session store, nothing to sync");
            return None;
        };

        match sync.sync_pending().await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(error = %e, "Could not list pending sessions");
                None
            }
        }
    }

    /// Runs the sync routine on demand.
    ///
    /// # Errors
    /// Returns `NoStorage` without a store, or the listing error.
    pub async fn sync_now(&self) -> Result<SyncReport> {
        match &self.sync {
            Some(sync) => sync.sync_pending().await,
            None => Err(AppError::NoStorage),
        }
    }

    /// Total number of stored sessions and how many are pending.
    ///
    /// # Errors
    /// Returns `NoStorage` without a store, or the read error.
    pub async fn counts(&self) -> Result<(usize, usize)> {
        let store = self.store()?;
        let total = store.count().await?;
        let pending = store.get_by_status(SyncStatus::Pending).await?.len();
        Ok((total, pending))
    }

    fn store(&self) -> Result<&SessionStore> {
        self.store.as_ref().ok_or(AppError::NoStorage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewSession, Phase};
    use crate::infrastructure::environment::testing::{CountingHaptics, ManualClock};
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::Ordering;
    use tempfile::{tempdir, TempDir};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap()
    }

    async fn controller() -> (TempDir, ManualClock, FeedingController) {
        let dir = tempdir().unwrap();
        let store = SessionStore::open(&dir.path().join("feedings.db"))
            .await
            .unwrap();
        let clock = ManualClock::new(t0());
        let controller = FeedingController::new(
            Some(store),
            LocalOnlySync,
            Box::new(clock.clone()),
            Box::new(CountingHaptics::default()),
            TrackerConfig::default(),
        );
        (dir, clock, controller)
    }

    async fn record_feed(
        controller: &FeedingController,
        clock: &ManualClock,
        secs: i64,
        amount: u32,
        online: bool,
    ) -> FeedingSession {
        let mut timer = FeedTimer::default();
        controller.start(&mut timer).unwrap();
        clock.advance(Duration::seconds(secs));
        controller.stop(&mut timer).unwrap();
        controller.set_amount(&mut timer, amount);

        match controller.save(&mut timer, online).await {
            SaveOutcome::Saved { session, .. } => session,
            SaveOutcome::Failed { error } => panic!("save failed: {error}"),
        }
    }

    #[tokio::test]
    async fn test_ninety_second_feed_scenario() {
        let (_dir, clock, controller) = controller().await;
        let mut timer = FeedTimer::default();

        controller.start(&mut timer).unwrap();
        clock.advance(Duration::seconds(90));
        controller.stop(&mut timer).unwrap();
        assert_eq!(controller.display(&timer), "01:30");
        controller.set_amount(&mut timer, 120);

        let outcome = controller.save(&mut timer, true).await;
        assert_eq!(outcome.notice(), Notice::Success("Feeding session saved".into()));

        let SaveOutcome::Saved { session, history } = outcome else {
            panic!("expected a saved session");
        };
        assert_eq!(session.start_time, t0());
        assert_eq!(session.end_time, t0() + Duration::seconds(90));
        assert_eq!(session.duration_ms, 90_000);
        assert_eq!(session.amount_ml, 120);
        assert_eq!(session.sync_status, SyncStatus::Synced);
        assert_eq!(history, vec![session]);

        assert_eq!(controller.display(&timer), "00:00");
        assert_eq!(timer.pending_amount(), 0);
        assert!(!timer.amount_input_visible());
        assert_eq!(timer.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_offline_save_is_pending() {
        let (_dir, clock, controller) = controller().await;

        let offline = record_feed(&controller, &clock, 30, 50, false).await;
        let online = record_feed(&controller, &clock, 30, 50, true).await;

        assert_eq!(offline.sync_status, SyncStatus::Pending);
        assert_eq!(online.sync_status, SyncStatus::Synced);
    }

    #[tokio::test]
    async fn test_two_feeds_newest_first_in_whole_minutes() {
        let (_dir, clock, controller) = controller().await;

        let first = record_feed(&controller, &clock, 30, 50, true).await;
        clock.advance(Duration::minutes(10));
        let second = record_feed(&controller, &clock, 45, 80, true).await;

        let history = controller.load_history().await.unwrap();
        assert_eq!(history, vec![second.clone(), first.clone()]);
        assert_eq!(second.whole_minutes(), 0);
        assert_eq!(first.whole_minutes(), 0);
    }

    #[tokio::test]
    async fn test_history_shows_ten_most_recent() {
        let (_dir, clock, controller) = controller().await;

        for _ in 0..12 {
            record_feed(&controller, &clock, 60, 90, true).await;
            clock.advance(Duration::hours(1));
        }

        let history = controller.load_history().await.unwrap();
        assert_eq!(history.len(), 10);
        assert!(history
            .windows(2)
            .all(|pair| pair[0].start_time > pair[1].start_time));
        assert_eq!(history[0].id, 12);
        assert_eq!(history[9].id, 3);
    }

    #[tokio::test]
    async fn test_duration_matches_timestamps() {
        let (_dir, clock, controller) = controller().await;

        for secs in [1, 59, 61, 3599] {
            let session = record_feed(&controller, &clock, secs, 0, true).await;
            assert_eq!(
                session.duration_ms,
                (session.end_time - session.start_time).num_milliseconds()
            );
            assert_eq!(session.duration_ms, secs * 1000);
        }
    }

    #[tokio::test]
    async fn test_amount_buttons_clamp_at_zero() {
        let (_dir, _clock, controller) = controller().await;
        let mut timer = FeedTimer::default();

        assert_eq!(controller.adjust_amount(&mut timer, -1), 0);
        assert_eq!(controller.adjust_amount(&mut timer, -1), 0);
        assert_eq!(controller.adjust_amount(&mut timer, 3), 30);
        assert_eq!(controller.adjust_amount(&mut timer, -1), 20);
    }

    #[tokio::test]
    async fn test_save_without_store_keeps_timer() {
        let clock = ManualClock::new(t0());
        let controller: FeedingController = FeedingController::new(
            None,
            LocalOnlySync,
            Box::new(clock.clone()),
            Box::new(CountingHaptics::default()),
            TrackerConfig::default(),
        );

        let mut timer = FeedTimer::default();
        controller.start(&mut timer).unwrap();
        clock.advance(Duration::seconds(40));
        controller.stop(&mut timer).unwrap();
        controller.set_amount(&mut timer, 60);
        let before = timer.clone();

        let outcome = controller.save(&mut timer, true).await;
        assert!(matches!(
            outcome,
            SaveOutcome::Failed {
                error: AppError::NoStorage
            }
        ));
        assert!(matches!(outcome.notice(), Notice::Error(_)));
        assert_eq!(timer, before);
        assert!(controller.load_history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_keeps_timer() {
        let (dir, clock, controller) = controller().await;
        {
            let conn = rusqlite::Connection::open(dir.path().join("feedings.db")).unwrap();
            conn.execute_batch("DROP TABLE sessions").unwrap();
        }

        let mut timer = FeedTimer::default();
        controller.start(&mut timer).unwrap();
        clock.advance(Duration::seconds(20));
        controller.stop(&mut timer).unwrap();
        let before = timer.clone();

        let outcome = controller.save(&mut timer, true).await;
        assert!(matches!(
            outcome,
            SaveOutcome::Failed {
                error: AppError::Database { .. }
            }
        ));
        assert_eq!(timer, before);
    }

    #[tokio::test]
    async fn test_save_before_stop_is_rejected() {
        let (_dir, _clock, controller) = controller().await;
        let mut timer = FeedTimer::default();
        controller.start(&mut timer).unwrap();

        let outcome = controller.save(&mut timer, true).await;
        assert!(matches!(
            outcome,
            SaveOutcome::Failed {
                error: AppError::InvalidTransition { .. }
            }
        ));
        assert!(timer.is_feeding());
    }

    #[tokio::test]
    async fn test_coming_online_syncs_pending_sessions() {
        let (_dir, clock, controller) = controller().await;
        let offline = record_feed(&controller, &clock, 90, 120, false).await;

        assert!(controller.handle_online_status(false).await.is_none());
        assert_eq!(controller.counts().await.unwrap(), (1, 1));

        let report = controller.handle_online_status(true).await.unwrap();
        assert_eq!(report.synced, 1);
        assert_eq!(controller.counts().await.unwrap(), (1, 0));

        let history = controller.load_history().await.unwrap();
        assert_eq!(history, vec![offline.synced()]);
    }

    #[tokio::test]
    async fn test_actions_pulse_haptics() {
        let dir = tempdir().unwrap();
        let store = SessionStore::open(&dir.path().join("feedings.db"))
            .await
            .unwrap();
        let haptics = CountingHaptics::default();
        let controller: FeedingController = FeedingController::new(
            Some(store),
            LocalOnlySync,
            Box::new(ManualClock::new(t0())),
            Box::new(haptics.clone()),
            TrackerConfig::default(),
        );

        let mut timer = FeedTimer::default();
        controller.press_action(&mut timer);
        controller.press_action(&mut timer);
        controller.adjust_amount(&mut timer, 1);

        assert_eq!(haptics.pulses.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_length_feed_is_valid() {
        let (_dir, _clock, controller) = controller().await;
        let store = controller.store().unwrap();
        let session = NewSession::new(t0(), t0(), 0, SyncStatus::Pending).unwrap();

        let saved = store.insert(session).await.unwrap();
        assert_eq!(saved.duration_ms, 0);
    }
}
