//! ==============================================================================
//! clock.rs - node time source
//! ==============================================================================
//!
//! purpose:
//!     every periodic decision (sensor due, fetch due, backoff gate) is made
//!     in whole seconds from a single `now()` per tick.
//!
//!     before ntp has synced, the wall clock reports a date near 1970. in that
//!     case we count seconds since boot instead so intervals keep working.
//!
//! relationships:
//!     - used by: scheduler.rs (samples now once per tick)
//!     - uses: sysinfo (system uptime)
//!
//! ==============================================================================

use std::time::{SystemTime, UNIX_EPOCH};

/// any wall clock value at or below this (2001-09-09) means "not synced yet"
pub const EPOCH_SANITY_THRESHOLD: u64 = 1_000_000_000;

pub trait Clock {
    /// current time in seconds; never fails
    fn now(&self) -> u64;
}

/// wall clock with an uptime fallback
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        pick_time(wall, sysinfo::System::uptime)
    }
}

/// wall clock if plausible, uptime otherwise
fn pick_time(wall: u64, uptime: impl FnOnce() -> u64) -> u64 {
    if wall > EPOCH_SANITY_THRESHOLD {
        wall
    } else {
        uptime()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synced_wall_clock_is_used() {
        assert_eq!(pick_time(1_700_000_000, || 42), 1_700_000_000);
    }

    #[test]
    fn test_unsynced_wall_clock_falls_back_to_uptime() {
        assert_eq!(pick_time(12, || 42), 42);
        assert_eq!(pick_time(EPOCH_SANITY_THRESHOLD, || 7), 7);
    }

    #[test]
    fn test_system_clock_is_plausible() {
        // either a synced epoch or an uptime; both are non-zero on a running host
        assert!(SystemClock.now() > 0);
    }
}
