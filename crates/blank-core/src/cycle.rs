//! The cycle clock: partitions wall-clock time into numbered days.
//!
//! Cycle `k` covers `[epoch + (k-1)·day, epoch + k·day)`. Anything before the
//! epoch resolves to cycle 1. This is the only cycle formula in the system;
//! every component that needs a day number goes through [`CycleClock`].

use serde::{Deserialize, Serialize};

use crate::time::{SECS_PER_DAY, parse_iso8601};

/// 2026-03-01T00:00:00Z
pub const DEFAULT_EPOCH_SECS: i64 = 1_772_323_200;

/// Cycle number for `now` relative to `epoch` (both Unix seconds). Always ≥ 1.
pub fn cycle_number(now: i64, epoch: i64) -> u32 {
    let elapsed_days = (now - epoch).div_euclid(SECS_PER_DAY);
    let cycle = elapsed_days.saturating_add(1).max(1);
    u32::try_from(cycle).unwrap_or(u32::MAX)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleClock {
    epoch_secs: i64,
}

impl Default for CycleClock {
    fn default() -> Self {
        Self::new(DEFAULT_EPOCH_SECS)
    }
}

impl CycleClock {
    pub fn new(epoch_secs: i64) -> Self {
        Self { epoch_secs }
    }

    /// Build from an ISO-8601 date such as `2026-03-01`.
    pub fn from_iso8601(epoch: &str) -> Option<Self> {
        parse_iso8601(epoch).map(Self::new)
    }

    pub fn epoch_secs(&self) -> i64 {
        self.epoch_secs
    }

    pub fn cycle_at(&self, now_secs: i64) -> u32 {
        cycle_number(now_secs, self.epoch_secs)
    }

    /// Unix seconds at which `cycle` begins.
    pub fn cycle_start(&self, cycle: u32) -> i64 {
        self.epoch_secs + (cycle.max(1) as i64 - 1) * SECS_PER_DAY
    }
}
