// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reservation model and lifecycle states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a reservation.
///
/// Transitions run exclusively inside the lifecycle scheduler:
/// `pending -> confirmed -> completed -> reviewed`, with `cancelled`
/// reachable from `pending` and `confirmed`. Users only ever *request*
/// cancellation; the scheduler performs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Completed,
    Reviewed,
    Cancelled,
}

impl ReservationStatus {
    /// Wire/storage representation, also used in Firestore queries.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Reviewed => "reviewed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    /// Whether a cancellation request can still be honored.
    pub fn cancellable(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        )
    }
}

/// Reservation record stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    /// Document id
    pub id: String,
    /// Tour being reserved
    pub tour_id: String,
    /// Chosen start instant of the tour occurrence
    pub date: DateTime<Utc>,
    pub status: ReservationStatus,
    /// Review written for this reservation, once one exists
    pub review_id: Option<String>,
    /// When review requests were sent, in send order
    pub review_requests: Vec<DateTime<Utc>>,
    /// Set when the confirmation notice has gone out
    pub notified: bool,
    /// Set by the cancel endpoint; consumed by the cancel pass
    pub cancellation_requested: bool,
    /// When the reservation was created (RFC3339)
    pub created_at: String,
}

impl Reservation {
    /// A freshly booked reservation, before any scheduler pass has seen it.
    pub fn new(id: String, tour_id: String, date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            tour_id,
            date,
            status: ReservationStatus::Pending,
            review_id: None,
            review_requests: Vec::new(),
            notified: false,
            cancellation_requested: false,
            created_at: now.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ReservationStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
        assert_eq!(ReservationStatus::Pending.as_str(), "pending");
    }

    #[test]
    fn test_cancellable_states() {
        assert!(ReservationStatus::Pending.cancellable());
        assert!(ReservationStatus::Confirmed.cancellable());
        assert!(!ReservationStatus::Completed.cancellable());
        assert!(!ReservationStatus::Reviewed.cancellable());
        assert!(!ReservationStatus::Cancelled.cancellable());
    }
}
