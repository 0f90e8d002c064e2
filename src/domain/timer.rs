//! Feed timer state machine.
//!
//! The controller never keeps hidden in-progress state of its own: every
//! handler receives the `FeedTimer` by reference and the timer is persisted
//! between CLI invocations.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::error::{AppError, Result};
use super::models::{NewSession, SyncStatus};

/// Timer phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Feeding,
}

/// Outcome of pressing the action button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started,
    Stopped,
}

/// In-progress feed owned by the UI side until it is saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedTimer {
    phase: Phase,
    start_time: Option<DateTime<Utc>>,
    /// Moment of the last stop; freezes the display until the feed is saved.
    stopped_at: Option<DateTime<Utc>>,
    pending_amount: u32,
    amount_input_visible: bool,
}

impl FeedTimer {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    #[must_use]
    pub const fn pending_amount(&self) -> u32 {
        self.pending_amount
    }

    #[must_use]
    pub const fn amount_input_visible(&self) -> bool {
        self.amount_input_visible
    }

    #[must_use]
    pub fn is_feeding(&self) -> bool {
        self.phase == Phase::Feeding
    }

    /// `idle -> feeding`.
    ///
    /// # Errors
    /// Returns `InvalidTransition` if a feed is already running.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.is_feeding() {
            return Err(AppError::transition("a feed is already running"));
        }

        self.begin(now);
        Ok(())
    }

    /// `feeding -> idle`. The display keeps the stopped value and the amount
    /// input becomes visible.
    ///
    /// # Errors
    /// Returns `InvalidTransition` if no feed is running.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.is_feeding() {
            return Err(AppError::transition("no feed is running"));
        }

        self.halt(now);
        Ok(())
    }

    /// Single action button: starts when idle, stops when feeding.
    pub fn toggle(&mut self, now: DateTime<Utc>) -> Transition {
        if self.is_feeding() {
            self.halt(now);
            Transition::Stopped
        } else {
            self.begin(now);
            Transition::Started
        }
    }

    fn begin(&mut self, now: DateTime<Utc>) {
        self.phase = Phase::Feeding;
        self.start_time = Some(now);
        self.stopped_at = None;
    }

    fn halt(&mut self, now: DateTime<Utc>) {
        self.phase = Phase::Idle;
        self.stopped_at = Some(now);
        self.amount_input_visible = true;
    }

    /// Adds `delta` milliliters, clamping at zero.
    pub fn adjust_amount(&mut self, delta: i64) -> u32 {
        let next = i64::from(self.pending_amount)
            .saturating_add(delta)
            .clamp(0, i64::from(u32::MAX));
        self.pending_amount = u32::try_from(next).unwrap_or(u32::MAX);
        self.pending_amount
    }

    /// Direct numeric entry.
    pub fn set_amount(&mut self, amount_ml: u32) {
        self.pending_amount = amount_ml;
    }

    /// Elapsed time as shown on the display.
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> TimeDelta {
        let Some(start) = self.start_time else {
            return TimeDelta::zero();
        };

        let until = match self.phase {
            Phase::Feeding => now,
            Phase::Idle => match self.stopped_at {
                Some(stopped) => stopped,
                None => return TimeDelta::zero(),
            },
        };

        (until - start).max(TimeDelta::zero())
    }

    /// Builds the session to persist. `end_time` is the moment of saving.
    ///
    /// # Errors
    /// Returns `InvalidTransition` unless a stopped feed is waiting for its
    /// amount, or `InvalidData` if the clock went backwards.
    pub fn complete(&self, now: DateTime<Utc>, online: bool) -> Result<NewSession> {
        if self.is_feeding() {
            return Err(AppError::transition("stop the feed before saving"));
        }

        let start = match (self.amount_input_visible, self.start_time) {
            (true, Some(start)) => start,
            _ => return Err(AppError::transition("there is no finished feed to save")),
        };

        NewSession::new(
            start,
            now,
            self.pending_amount,
            SyncStatus::for_connectivity(online),
        )
    }

    /// Back to a fresh idle timer after a successful save.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Formats elapsed time as `MM:SS`; minutes may exceed two digits.
#[must_use]
pub fn format_elapsed(elapsed: TimeDelta) -> String {
    let total_ms = elapsed.num_milliseconds().max(0);
    let minutes = total_ms / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    format!("{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap()
    }

    #[test]
    fn test_start_stop_transitions() {
        let mut timer = FeedTimer::default();
        timer.start(t0()).unwrap();
        assert_eq!(timer.phase(), Phase::Feeding);
        assert!(!timer.amount_input_visible());
        assert!(timer.start(t0()).is_err());

        timer.stop(t0() + Duration::seconds(90)).unwrap();
        assert_eq!(timer.phase(), Phase::Idle);
        assert!(timer.amount_input_visible());
        assert!(timer.stop(t0()).is_err());
    }

    #[test]
    fn test_toggle_alternates() {
        let mut timer = FeedTimer::default();
        assert_eq!(timer.toggle(t0()), Transition::Started);
        assert_eq!(timer.toggle(t0() + Duration::seconds(5)), Transition::Stopped);
        assert_eq!(timer.toggle(t0() + Duration::seconds(9)), Transition::Started);
    }

    #[test]
    fn test_display_freezes_after_stop() {
        let mut timer = FeedTimer::default();
        timer.start(t0()).unwrap();
        assert_eq!(format_elapsed(timer.elapsed(t0() + Duration::seconds(61))), "01:01");

        timer.stop(t0() + Duration::seconds(90)).unwrap();
        assert_eq!(format_elapsed(timer.elapsed(t0() + Duration::hours(1))), "01:30");
    }

    #[test]
    fn test_decrement_at_zero_stays_zero() {
        let mut timer = FeedTimer::default();
        assert_eq!(timer.adjust_amount(-10), 0);
        assert_eq!(timer.adjust_amount(-10), 0);
        assert_eq!(timer.adjust_amount(10), 10);
        assert_eq!(timer.adjust_amount(-30), 0);
    }

    #[test]
    fn test_complete_requires_stopped_feed() {
        let mut timer = FeedTimer::default();
        assert!(matches!(
            timer.complete(t0(), true),
            Err(AppError::InvalidTransition { .. })
        ));

        timer.start(t0()).unwrap();
        assert!(timer.complete(t0(), true).is_err());
    }

    #[test]
    fn test_complete_uses_save_time_and_connectivity() {
        let mut timer = FeedTimer::default();
        timer.start(t0()).unwrap();
        timer.stop(t0() + Duration::seconds(90)).unwrap();
        timer.set_amount(120);

        let online = timer.complete(t0() + Duration::seconds(90), true).unwrap();
        assert_eq!(online.duration_ms(), 90_000);
        assert_eq!(online.amount_ml(), 120);
        assert_eq!(online.sync_status(), SyncStatus::Synced);

        let offline = timer.complete(t0() + Duration::seconds(95), false).unwrap();
        assert_eq!(offline.duration_ms(), 95_000);
        assert_eq!(offline.sync_status(), SyncStatus::Pending);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut timer = FeedTimer::default();
        timer.start(t0()).unwrap();
        timer.stop(t0() + Duration::seconds(10)).unwrap();
        timer.set_amount(80);
        timer.reset();

        assert_eq!(timer, FeedTimer::default());
        assert_eq!(format_elapsed(timer.elapsed(t0())), "00:00");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(TimeDelta::zero()), "00:00");
        assert_eq!(format_elapsed(Duration::milliseconds(59_999)), "00:59");
        assert_eq!(format_elapsed(Duration::minutes(125) + Duration::seconds(7)), "125:07");
        assert_eq!(format_elapsed(Duration::seconds(-5)), "00:00");
    }
}
