use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Seconds in one day, the unit of election durations.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Wall-clock instant in whole seconds since the UNIX epoch.
///
/// This is the ledger's only time unit. Windows are compared with plain
/// integer ordering, so there is no sub-second drift between the value a
/// caller observes and the value the ledger checks.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create from seconds since the UNIX epoch.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// The epoch itself.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Read the current wall-clock time.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self(secs)
    }

    /// Seconds since the UNIX epoch.
    pub const fn as_secs(self) -> u64 {
        self.0
    }

    pub fn checked_add_secs(self, secs: u64) -> Option<Self> {
        self.0.checked_add(secs).map(Self)
    }

    /// Add whole days, returning `None` if the result does not fit.
    pub fn checked_add_days(self, days: u64) -> Option<Self> {
        days.checked_mul(SECONDS_PER_DAY)
            .and_then(|secs| self.checked_add_secs(secs))
    }

    pub fn saturating_add_secs(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}s)", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn now_produces_reasonable_timestamp() {
        // Should be after 2020-01-01
        assert!(Timestamp::now().as_secs() > 1_577_836_800);
    }

    #[test]
    fn add_days_overflow_is_detected() {
        assert!(Timestamp::from_secs(u64::MAX - 10).checked_add_days(1).is_none());
        assert!(Timestamp::zero().checked_add_days(u64::MAX).is_none());
    }

    #[test]
    fn saturating_since_never_underflows() {
        let a = Timestamp::from_secs(10);
        let b = Timestamp::from_secs(25);
        assert_eq!(b.saturating_since(a), 15);
        assert_eq!(a.saturating_since(b), 0);
    }

    proptest! {
        #[test]
        fn add_days_is_exact(start in 0u64..4_000_000_000, days in 1u64..10_000) {
            let begin = Timestamp::from_secs(start);
            let end = begin.checked_add_days(days).unwrap();
            prop_assert_eq!(end.saturating_since(begin), days * SECONDS_PER_DAY);
        }
    }
}
