//! Simulation timestamps.
//!
//! Every engine computation takes an explicit [`Timestamp`] instead of reading
//! the wall clock, so a whole tick is a deterministic function of its inputs.
//! Only the binary crate converts real time into a `Timestamp`.

use serde::{Deserialize, Serialize};
use std::fmt;

const MILLIS_PER_SEC: f64 = 1_000.0;
const SECS_PER_HOUR: f64 = 3_600.0;

/// A point in simulation time, in milliseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Sentinel for events that never come due (e.g. permanently stationed
    /// deployments). Adding any offset to `NEVER` yields `NEVER`.
    pub const NEVER: Timestamp = Timestamp(i64::MAX);

    pub const fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    pub const fn from_secs(secs: i64) -> Self {
        Timestamp(secs * 1_000)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    pub const fn is_never(self) -> bool {
        self.0 == i64::MAX
    }

    /// This timestamp shifted forward by a (possibly fractional) number of
    /// seconds. `NEVER` is absorbing.
    pub fn plus_secs(self, secs: f64) -> Timestamp {
        if self.is_never() {
            return self;
        }
        Timestamp(self.0.saturating_add((secs * MILLIS_PER_SEC).round() as i64))
    }

    /// Signed seconds elapsed since `earlier`.
    pub fn secs_since(self, earlier: Timestamp) -> f64 {
        (self.0 - earlier.0) as f64 / MILLIS_PER_SEC
    }

    /// Signed hours elapsed since `earlier`.
    pub fn hours_since(self, earlier: Timestamp) -> f64 {
        self.secs_since(earlier) / SECS_PER_HOUR
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_never() {
            write!(f, "never")
        } else {
            write!(f, "t+{}ms", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_secs_fractional() {
        let t = Timestamp::from_secs(100);
        assert_eq!(t.plus_secs(2.5), Timestamp::from_millis(102_500));
    }

    #[test]
    fn test_never_is_absorbing() {
        assert!(Timestamp::NEVER.plus_secs(60.0).is_never());
    }

    #[test]
    fn test_hours_since() {
        let t0 = Timestamp::from_secs(0);
        let t1 = t0.plus_secs(5_400.0);
        assert_eq!(t1.hours_since(t0), 1.5);
        assert_eq!(t0.hours_since(t1), -1.5);
    }
}
