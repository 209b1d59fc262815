//! High-resolution time on top of the host's monotonic millisecond clock
//!
//! Readings are converted with integer arithmetic:
//! `total = round(millis * 1e6)`, then `(secs, nanos) = divmod(total, 1e9)`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::host::Host;

pub const NANOS_PER_SEC: u64 = 1_000_000_000;
const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// `[seconds, nanoseconds]` reading; ordered lexicographically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct HrTime {
    pub secs: u64,
    /// Always `< 1_000_000_000`
    pub nanos: u32,
}

impl HrTime {
    pub fn new(secs: u64, nanos: u32) -> Self {
        let carry = u64::from(nanos) / NANOS_PER_SEC;
        Self {
            secs: secs.saturating_add(carry),
            nanos: (u64::from(nanos) % NANOS_PER_SEC) as u32,
        }
    }

    pub fn from_nanos(total: u64) -> Self {
        Self {
            secs: total / NANOS_PER_SEC,
            nanos: (total % NANOS_PER_SEC) as u32,
        }
    }

    /// Negative and NaN readings clamp to zero
    pub fn from_millis(millis: f64) -> Self {
        Self::from_nanos(millis_to_nanos(millis))
    }

    pub fn as_nanos(&self) -> u64 {
        self.secs
            .saturating_mul(NANOS_PER_SEC)
            .saturating_add(u64::from(self.nanos))
    }

    /// Difference, or zero when `earlier` is actually later
    pub fn saturating_sub(self, earlier: HrTime) -> HrTime {
        HrTime::from_nanos(self.as_nanos().saturating_sub(earlier.as_nanos()))
    }

    pub fn checked_sub(self, earlier: HrTime) -> Option<HrTime> {
        self.as_nanos()
            .checked_sub(earlier.as_nanos())
            .map(HrTime::from_nanos)
    }
}

impl From<HrTime> for (u64, u32) {
    fn from(t: HrTime) -> Self {
        (t.secs, t.nanos)
    }
}

impl From<(u64, u32)> for HrTime {
    fn from((secs, nanos): (u64, u32)) -> Self {
        HrTime::new(secs, nanos)
    }
}

fn millis_to_nanos(millis: f64) -> u64 {
    // float→int `as` saturates and maps NaN to 0
    (millis * NANOS_PER_MILLI).round() as u64
}

/// Clock adapter over a host's monotonic milliseconds
#[derive(Clone)]
pub struct Clock {
    host: Arc<dyn Host>,
}

impl Clock {
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self { host }
    }

    /// Current reading
    pub fn now(&self) -> HrTime {
        HrTime::from_millis(self.host.monotonic_millis())
    }

    /// Time elapsed since `prior`, saturating at zero
    pub fn elapsed_since(&self, prior: HrTime) -> HrTime {
        self.now().saturating_sub(prior)
    }

    /// Current reading as a single nanosecond count
    pub fn now_nanos(&self) -> u64 {
        millis_to_nanos(self.host.monotonic_millis())
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SystemHost;
    use proptest::prelude::*;

    #[test]
    fn test_from_millis_splits_seconds() {
        assert_eq!(HrTime::from_millis(1500.25), HrTime { secs: 1, nanos: 500_250_000 });
        assert_eq!(HrTime::from_millis(0.0), HrTime::default());
        assert_eq!(HrTime::from_millis(-3.0), HrTime::default());
        assert_eq!(HrTime::from_millis(f64::NAN), HrTime::default());
    }

    #[test]
    fn test_new_normalizes_nanos() {
        assert_eq!(HrTime::new(1, 1_500_000_000), HrTime { secs: 2, nanos: 500_000_000 });
    }

    #[test]
    fn test_sub_across_second_boundary() {
        let a = HrTime::new(2, 100);
        let b = HrTime::new(1, 999_999_900);
        assert_eq!(a.saturating_sub(b), HrTime::new(0, 200));
        assert_eq!(b.saturating_sub(a), HrTime::default());
        assert_eq!(b.checked_sub(a), None);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = Clock::new(Arc::new(SystemHost::new()));
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
        assert!(clock.elapsed_since(first) <= clock.elapsed_since(HrTime::default()));
    }

    proptest! {
        #[test]
        fn prop_nanos_round_trip(total in 0u64..u64::MAX / 2) {
            let t = HrTime::from_nanos(total);
            prop_assert!(t.nanos < 1_000_000_000);
            prop_assert_eq!(t.as_nanos(), total);
        }

        #[test]
        fn prop_ordering_matches_nanos(a in 0u64..1u64 << 50, b in 0u64..1u64 << 50) {
            let (ta, tb) = (HrTime::from_nanos(a), HrTime::from_nanos(b));
            prop_assert_eq!(ta.cmp(&tb), a.cmp(&b));
        }
    }
}
