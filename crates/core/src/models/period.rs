//! Closed time interval value object

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A closed interval `[start, end]` with `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(Error::validation(
                "the end of a period must not precede its start",
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Both bounds are inclusive
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }

    /// Touching endpoints count as overlap
    pub fn overlaps(&self, other: &Period) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    pub fn ensure_does_not_overlap<'a>(
        &self,
        others: impl IntoIterator<Item = &'a Period>,
    ) -> Result<()> {
        match others.into_iter().find(|other| self.overlaps(other)) {
            Some(other) => Err(Error::invalid(format!(
                "period {self} overlaps existing period {other}"
            ))),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format("%Y-%m-%d %H:%M:%SZ"),
            self.end.format("%Y-%m-%d %H:%M:%SZ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_rejects_reversed_bounds() {
        assert!(matches!(
            Period::new(t0(), t0() - Duration::seconds(1)),
            Err(Error::Validation(_))
        ));
        assert!(Period::new(t0(), t0()).is_ok());
    }

    #[test]
    fn test_contains_is_inclusive() {
        let period = Period::new(t0(), t0() + Duration::days(1)).unwrap();
        assert!(period.contains(t0()));
        assert!(period.contains(t0() + Duration::days(1)));
        assert!(!period.contains(t0() + Duration::days(1) + Duration::seconds(1)));
        assert!(!period.contains(t0() - Duration::seconds(1)));
    }

    #[test]
    fn test_touching_periods_overlap() {
        let first = Period::new(t0(), t0() + Duration::days(7)).unwrap();
        let second = Period::new(t0() + Duration::days(7), t0() + Duration::days(8)).unwrap();
        let third = Period::new(t0() + Duration::days(9), t0() + Duration::days(10)).unwrap();

        assert!(first.overlaps(&second));
        assert!(!first.overlaps(&third));
        assert!(first.ensure_does_not_overlap([&third]).is_ok());
        assert!(matches!(
            first.ensure_does_not_overlap([&third, &second]),
            Err(Error::InvalidOperation(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_overlap_is_symmetric(a in 0i64..1000, b in 0i64..1000, c in 0i64..1000, d in 0i64..1000) {
            let p = Period::new(t0() + Duration::hours(a.min(b)), t0() + Duration::hours(a.max(b))).unwrap();
            let q = Period::new(t0() + Duration::hours(c.min(d)), t0() + Duration::hours(c.max(d))).unwrap();
            prop_assert_eq!(p.overlaps(&q), q.overlaps(&p));
        }

        #[test]
        fn prop_overlap_iff_shared_instant(a in 0i64..100, b in 0i64..100, c in 0i64..100, d in 0i64..100) {
            let p = Period::new(t0() + Duration::hours(a.min(b)), t0() + Duration::hours(a.max(b))).unwrap();
            let q = Period::new(t0() + Duration::hours(c.min(d)), t0() + Duration::hours(c.max(d))).unwrap();
            let shared = (0i64..100).any(|h| {
                let at = t0() + Duration::hours(h);
                p.contains(at) && q.contains(at)
            });
            prop_assert_eq!(p.overlaps(&q), shared);
        }
    }
}
