//! Capabilities consumed from the surrounding environment: the current time
//! and short haptic feedback pulses.

use std::io::Write;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};

/// Length of the pulse emitted on each user action.
pub const PULSE: Duration = Duration::from_millis(50);

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, truncated to milliseconds like everything the store keeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }
}

/// Short physical feedback on user actions. A no-op where unsupported.
pub trait Haptics: Send + Sync {
    fn pulse(&self, length: Duration);
}

/// Haptics disabled or unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn pulse(&self, _length: Duration) {}
}

/// Rings the terminal bell, the closest a terminal gets to a vibration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalBell;

impl Haptics for TerminalBell {
    fn pulse(&self, length: Duration) {
        let mut stderr = std::io::stderr();
        if let Err(e) = stderr.write_all(b"\x07").and_then(|()| stderr.flush()) {
            tracing::trace!(error = %e, "Bell unavailable");
        } else {
            tracing::trace!(length_ms = length.as_millis(), "Pulse");
        }
    }
}

/// Picks the haptics implementation for the configuration flag.
#[must_use]
pub fn haptics_for(enabled: bool) -> Box<dyn Haptics> {
    if enabled {
        Box::new(TerminalBell)
    } else {
        Box::new(NoHaptics)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_has_millisecond_precision() {
        let now = SystemClock.now();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000_000, 0);
    }
}
