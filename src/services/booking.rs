// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reservation booking service.
//!
//! Creating a reservation is a read-check-write sequence: load the
//! user's existing reservations, run the interval conflict check, then
//! insert. Two concurrent requests for the same user could both pass
//! the check before either commits, so the whole sequence runs under a
//! per-user async lock held in a shared registry.

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{new_object_id, Reservation, Tour, User};
use crate::services::interval::{conflicts_with_any, OccupiedInterval};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-user critical sections, shared across all request handlers.
pub type BookingLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Books tour reservations with conflict detection.
#[derive(Clone)]
pub struct BookingService {
    db: FirestoreDb,
    booking_locks: BookingLocks,
}

impl BookingService {
    pub fn new(db: FirestoreDb) -> Self {
        Self {
            db,
            booking_locks: Arc::new(DashMap::new()),
        }
    }

    /// Reserve `tour` for `user` at `date`.
    ///
    /// Rejects with [`AppError::Conflict`] if the new occupancy window
    /// overlaps any of the user's existing reservations. The check and
    /// the insert are serialized per user.
    pub async fn reserve(
        &self,
        user: &User,
        tour: &Tour,
        date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Reservation> {
        let lock = self
            .booking_locks
            .entry(user.id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let _guard = lock.lock().await;

        let candidate = OccupiedInterval::new(date, tour.duration_hours);
        let existing = self.occupied_intervals(user).await?;

        if conflicts_with_any(&candidate, &existing) {
            return Err(AppError::Conflict(
                "Tour already reserved for an overlapping time".to_string(),
            ));
        }

        let reservation = Reservation::new(new_object_id(), tour.id.clone(), date, now);
        self.db.upsert_reservation(&reservation).await?;

        // Ownership lives on the user document.
        let mut owner = user.clone();
        owner.reservation_ids.push(reservation.id.clone());
        self.db.upsert_user(&owner).await?;

        tracing::info!(
            user_id = %user.id,
            tour_id = %tour.id,
            reservation_id = %reservation.id,
            date = %date.to_rfc3339(),
            "Reservation created"
        );

        Ok(reservation)
    }

    /// Occupancy windows of all the user's live reservations.
    ///
    /// Cancelled reservations free their slot. A reservation whose tour
    /// is gone is skipped with a warning rather than blocking the book.
    async fn occupied_intervals(&self, user: &User) -> Result<Vec<OccupiedInterval>> {
        let reservations = self.db.reservations_for_user(user).await?;
        let mut intervals = Vec::with_capacity(reservations.len());

        for reservation in &reservations {
            if reservation.status == crate::models::ReservationStatus::Cancelled {
                continue;
            }
            match self.db.get_tour(&reservation.tour_id).await? {
                Some(tour) => {
                    intervals.push(OccupiedInterval::new(reservation.date, tour.duration_hours));
                }
                None => {
                    tracing::warn!(
                        reservation_id = %reservation.id,
                        tour_id = %reservation.tour_id,
                        "Tour missing for reservation during conflict check"
                    );
                }
            }
        }
        Ok(intervals)
    }
}
