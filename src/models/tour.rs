// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tour model for storage and API.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use validator::ValidationError;

/// Geographic point (longitude, latitude), GeoJSON coordinate order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

/// Weekly repeating schedule: `days[weekday]` lists the start times
/// offered on that weekday (Monday = 0), beginning at `start_date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodicSchedule {
    pub start_date: NaiveDate,
    pub days: Vec<Vec<NaiveTime>>,
}

/// Scheduled start instants for a tour: either an explicit list of
/// datetimes or a weekly repeating schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TourDates {
    Explicit(Vec<DateTime<Utc>>),
    Periodic(PeriodicSchedule),
}

/// Tour record stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tour {
    /// Document id
    pub id: String,
    pub name: String,
    pub description: String,
    /// Meeting point, used by the tours-near query
    pub location: GeoPoint,
    /// Guide offering this tour
    pub guide_id: String,
    /// Average review rating, absent until first review
    pub rating: Option<f64>,
    pub guide_salary: f64,
    /// Length of the tour in hours; fractions are fractions of an hour
    /// (1.5 means 90 minutes)
    pub duration_hours: f64,
    pub dates: TourDates,
}

/// Validator hook: explicit dates must not already have passed, and a
/// periodic schedule must cover all seven weekdays (empty days allowed).
pub fn validate_dates(dates: &TourDates) -> Result<(), ValidationError> {
    match dates {
        TourDates::Explicit(list) => {
            if list.is_empty() {
                return Err(ValidationError::new("dates_empty")
                    .with_message("At least one date is required".into()));
            }
            let now = Utc::now();
            if list.iter().any(|d| *d < now) {
                return Err(ValidationError::new("dates_past")
                    .with_message("Dates cannot be in the past".into()));
            }
        }
        TourDates::Periodic(schedule) => {
            if schedule.days.len() != 7 {
                return Err(ValidationError::new("days_shape")
                    .with_message("Periodic schedule needs one slot list per weekday".into()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_validate_dates_rejects_past() {
        let past = TourDates::Explicit(vec![Utc::now() - Duration::days(1)]);
        assert!(validate_dates(&past).is_err());

        let future = TourDates::Explicit(vec![Utc::now() + Duration::days(1)]);
        assert!(validate_dates(&future).is_ok());
    }

    #[test]
    fn test_validate_periodic_shape() {
        let schedule = PeriodicSchedule {
            start_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            days: vec![Vec::new(); 7],
        };
        assert!(validate_dates(&TourDates::Periodic(schedule)).is_ok());

        let short = PeriodicSchedule {
            start_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            days: vec![Vec::new(); 3],
        };
        assert!(validate_dates(&TourDates::Periodic(short)).is_err());
    }
}
