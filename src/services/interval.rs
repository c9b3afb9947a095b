// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Occupied-interval arithmetic for reservation conflict detection.
//!
//! A reservation occupies `[date, date + tour duration]`. The overlap
//! test uses closed endpoints on purpose: a booking that starts exactly
//! when another ends still conflicts, so a guide is never double-booked
//! at a transition boundary.

use chrono::{DateTime, Duration, Utc};

/// Time span during which a reservation holds a guide busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupiedInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl OccupiedInterval {
    /// Interval occupied by a reservation starting at `start` for a tour
    /// of `duration_hours`. An end past the representable range saturates
    /// to the maximum instant.
    pub fn new(start: DateTime<Utc>, duration_hours: f64) -> Self {
        Self {
            start,
            end: start
                .checked_add_signed(duration_from_hours(duration_hours))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Closed-interval overlap test, symmetric in both directions.
    pub fn intersects(&self, other: &OccupiedInterval) -> bool {
        (self.start <= other.start && other.start <= self.end)
            || (other.start <= self.start && self.start <= other.end)
    }
}

/// Convert a fractional-hours tour duration to a `chrono::Duration`.
///
/// The fraction is a fraction *of an hour*: 1.5 hours is 90 minutes.
/// Negative or non-finite durations clamp to zero (validation rejects
/// them upstream), and durations beyond chrono's range saturate to the
/// maximum rather than panicking: stored data must never be able to
/// take down a scheduler pass.
pub fn duration_from_hours(hours: f64) -> Duration {
    if hours <= 0.0 || !hours.is_finite() {
        return Duration::zero();
    }
    Duration::try_minutes((hours * 60.0).round() as i64).unwrap_or(Duration::MAX)
}

/// True if `candidate` overlaps any interval in `existing`.
pub fn conflicts_with_any(candidate: &OccupiedInterval, existing: &[OccupiedInterval]) -> bool {
    existing.iter().any(|iv| iv.intersects(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_duration_conversion_uses_minutes_of_hour() {
        assert_eq!(duration_from_hours(1.5), Duration::minutes(90));
        assert_eq!(duration_from_hours(2.5), Duration::minutes(150));
        assert_eq!(duration_from_hours(0.25), Duration::minutes(15));
        assert_eq!(duration_from_hours(0.0), Duration::zero());
        assert_eq!(duration_from_hours(-1.0), Duration::zero());
    }

    #[test]
    fn test_absurd_durations_saturate_without_panicking() {
        assert_eq!(duration_from_hours(1e18), Duration::MAX);
        assert_eq!(duration_from_hours(f64::INFINITY), Duration::zero());

        let iv = OccupiedInterval::new(at(10, 0), 1e18);
        assert_eq!(iv.end, DateTime::<Utc>::MAX_UTC);
        assert!(iv.intersects(&OccupiedInterval::new(at(12, 0), 1.0)));
    }

    #[test]
    fn test_overlapping_intervals_intersect_symmetrically() {
        // R1 at 10:00 for 2h, R2 at 11:00: R2 starts inside R1
        let r1 = OccupiedInterval::new(at(10, 0), 2.0);
        let r2 = OccupiedInterval::new(at(11, 0), 2.0);
        assert!(r1.intersects(&r2));
        assert!(r2.intersects(&r1));
    }

    #[test]
    fn test_disjoint_intervals_do_not_intersect() {
        // R1 at 10:00 for 2h ends at 12:00; R3 at 13:00 is clear of it
        let r1 = OccupiedInterval::new(at(10, 0), 2.0);
        let r3 = OccupiedInterval::new(at(13, 0), 2.0);
        assert!(!r1.intersects(&r3));
        assert!(!r3.intersects(&r1));
    }

    #[test]
    fn test_back_to_back_bookings_conflict() {
        // Closed endpoints: ending exactly when the other starts conflicts
        let r1 = OccupiedInterval::new(at(10, 0), 2.0);
        let r2 = OccupiedInterval::new(at(12, 0), 1.0);
        assert_eq!(r1.end, r2.start);
        assert!(r1.intersects(&r2));
        assert!(r2.intersects(&r1));
    }

    #[test]
    fn test_containment_intersects() {
        let outer = OccupiedInterval::new(at(9, 0), 8.0);
        let inner = OccupiedInterval::new(at(11, 0), 1.0);
        assert!(outer.intersects(&inner));
        assert!(inner.intersects(&outer));
    }

    #[test]
    fn test_fractional_duration_boundary() {
        // 1.5h tour at 10:00 ends 11:30; a 11:31 booking is clear
        let r1 = OccupiedInterval::new(at(10, 0), 1.5);
        let clear = OccupiedInterval::new(at(11, 31), 1.0);
        let touching = OccupiedInterval::new(at(11, 30), 1.0);
        assert!(!r1.intersects(&clear));
        assert!(r1.intersects(&touching));
    }

    #[test]
    fn test_conflicts_with_any() {
        let existing = vec![
            OccupiedInterval::new(at(8, 0), 1.0),
            OccupiedInterval::new(at(10, 0), 2.0),
        ];
        let candidate = OccupiedInterval::new(at(11, 0), 1.0);
        assert!(conflicts_with_any(&candidate, &existing));

        let free = OccupiedInterval::new(at(14, 0), 1.0);
        assert!(!conflicts_with_any(&free, &existing));
    }
}
