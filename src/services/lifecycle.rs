// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reservation lifecycle scheduler.
//!
//! A single periodic background task walks every reservation through
//! `pending -> confirmed -> completed -> reviewed` (or `cancelled`).
//! Each run executes five passes:
//!
//! 1. confirm reservations whose start instant has arrived
//! 2. cancel reservations flagged by a cancellation request
//! 3. move fully elapsed reservations to `completed`
//! 4. send review requests at the 1-hour and 1-week checkpoints
//! 5. move reviewed reservations to `reviewed`
//!
//! Every transition is decided by a pure predicate over (reservation,
//! tour duration, now) so the state machine is testable without storage.
//! A failed item is skipped with a warning; a run never aborts early and
//! overlapping runs are prevented by a try-lock guard.

use crate::db::FirestoreDb;
use crate::error::Result;
use crate::models::{Reservation, ReservationStatus, Tour};
use crate::services::interval::duration_from_hours;
use crate::services::notify::Notifier;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Injectable current-instant source, so tests can simulate elapsed
/// time without waiting on a timer.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock pinned to a fixed instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ─── Transition Predicates ───────────────────────────────────────

/// Instant at which a reservation's tour is fully over, saturating at
/// the maximum representable instant for absurd stored durations.
pub fn tour_end(reservation: &Reservation, duration_hours: f64) -> DateTime<Utc> {
    reservation
        .date
        .checked_add_signed(duration_from_hours(duration_hours))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Pass 1: pending, start instant reached, confirmation not yet sent.
pub fn confirmation_due(reservation: &Reservation, now: DateTime<Utc>) -> bool {
    reservation.status == ReservationStatus::Pending && reservation.date <= now
}

/// Pass 2: a cancellation request on a still-cancellable reservation.
pub fn cancellation_due(reservation: &Reservation) -> bool {
    reservation.cancellation_requested && reservation.status.cancellable()
}

/// Pass 3: confirmed and the occupancy window has fully elapsed.
pub fn completion_due(reservation: &Reservation, duration_hours: f64, now: DateTime<Utc>) -> bool {
    reservation.status == ReservationStatus::Confirmed
        && tour_end(reservation, duration_hours) <= now
}

/// Pass 5: completed and a review has been written.
pub fn review_move_due(reservation: &Reservation) -> bool {
    reservation.status == ReservationStatus::Completed && reservation.review_id.is_some()
}

/// Fixed offsets after tour completion at which a review request
/// becomes due if not already sent past that offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewCheckpoint {
    OneHour,
    OneWeek,
}

impl ReviewCheckpoint {
    pub const ALL: [ReviewCheckpoint; 2] = [ReviewCheckpoint::OneHour, ReviewCheckpoint::OneWeek];

    pub fn offset(&self) -> Duration {
        match self {
            ReviewCheckpoint::OneHour => Duration::hours(1),
            ReviewCheckpoint::OneWeek => Duration::weeks(1),
        }
    }

    /// The instant after which this checkpoint is due: tour end + offset,
    /// saturating so a never-ending tour is never asked for a review.
    pub fn threshold(&self, end: DateTime<Utc>) -> DateTime<Utc> {
        end.checked_add_signed(self.offset())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Pass 4: checkpoints currently due for a completed reservation.
///
/// A checkpoint is due once its threshold has passed and no recorded
/// request timestamp is at or past that threshold. The comparison is
/// against timestamps, not a count, so re-evaluation is idempotent
/// (the appended timestamp always covers the checkpoint that fired,
/// including at the exact threshold instant) and a manually inserted
/// request is honored. A reservation whose review is already written
/// is never asked again, even before Pass 5 has moved its state.
pub fn due_review_checkpoints(
    reservation: &Reservation,
    duration_hours: f64,
    now: DateTime<Utc>,
) -> Vec<ReviewCheckpoint> {
    if reservation.status != ReservationStatus::Completed || reservation.review_id.is_some() {
        return Vec::new();
    }
    let end = tour_end(reservation, duration_hours);

    ReviewCheckpoint::ALL
        .into_iter()
        .filter(|cp| {
            let threshold = cp.threshold(end);
            now >= threshold && !reservation.review_requests.iter().any(|t| *t >= threshold)
        })
        .collect()
}

/// Pass 3 planning: which of the scanned reservations transition to
/// `completed`. A missing tour skips that item only.
pub fn plan_completions(
    items: &[(Reservation, Option<Tour>)],
    now: DateTime<Utc>,
) -> Vec<Reservation> {
    let mut due = Vec::new();
    for (reservation, tour) in items {
        let Some(tour) = tour else {
            tracing::warn!(
                reservation_id = %reservation.id,
                tour_id = %reservation.tour_id,
                "Tour missing during completion pass, skipping reservation"
            );
            continue;
        };
        if completion_due(reservation, tour.duration_hours, now) {
            let mut updated = reservation.clone();
            updated.status = ReservationStatus::Completed;
            due.push(updated);
        }
    }
    due
}

// ─── Scheduler ───────────────────────────────────────────────────

/// Periodic reservation lifecycle scheduler.
pub struct LifecycleScheduler {
    db: FirestoreDb,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    interval: std::time::Duration,
    // Single-flight guard: a tick is skipped while a run is in progress.
    run_guard: Mutex<()>,
}

impl LifecycleScheduler {
    pub fn new(
        db: FirestoreDb,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        interval: std::time::Duration,
    ) -> Self {
        Self {
            db,
            notifier,
            clock,
            interval,
            run_guard: Mutex::new(()),
        }
    }

    /// Spawn the periodic run loop as a background task.
    pub fn spawn(self: Arc<Self>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Lifecycle scheduler spawned"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let Ok(_guard) = self.run_guard.try_lock() else {
                    tracing::warn!("Previous lifecycle run still in progress, skipping tick");
                    continue;
                };
                self.run_once().await;
            }
        });
    }

    /// Execute all passes once. Pass failures are logged, never fatal:
    /// the next scheduled run retries whatever was left undone.
    pub async fn run_once(&self) {
        let now = self.clock.now();

        if let Err(e) = self.confirm_pass(now).await {
            tracing::error!(error = %e, "Confirm pass failed");
        }
        if let Err(e) = self.cancel_pass().await {
            tracing::error!(error = %e, "Cancel pass failed");
        }
        if let Err(e) = self.move_past_pass(now).await {
            tracing::error!(error = %e, "Move-past pass failed");
        }
        if let Err(e) = self.review_request_pass(now).await {
            tracing::error!(error = %e, "Review-request pass failed");
        }
        if let Err(e) = self.move_reviewed_pass().await {
            tracing::error!(error = %e, "Move-reviewed pass failed");
        }

        tracing::debug!("Lifecycle run complete");
    }

    /// Pass 1: notify guide and user of reservations whose tour date
    /// has arrived, moving them to `confirmed`.
    async fn confirm_pass(&self, now: DateTime<Utc>) -> Result<()> {
        let pending = self.db.list_reservations_by_status("pending").await?;

        for reservation in pending {
            if !confirmation_due(&reservation, now) {
                continue;
            }
            let Some(tour) = self.lookup_tour(&reservation).await else {
                continue;
            };

            let mut updated = reservation.clone();
            updated.status = ReservationStatus::Confirmed;
            updated.notified = true;
            if let Err(e) = self.db.upsert_reservation(&updated).await {
                tracing::warn!(reservation_id = %reservation.id, error = %e, "Confirm write failed");
                continue;
            }

            let message = format!(
                "Your reservation for \"{}\" on {} is confirmed",
                tour.name,
                reservation.date.to_rfc3339()
            );
            self.notify_parties(&reservation, &tour, &message).await;

            tracing::info!(reservation_id = %reservation.id, "Reservation confirmed");
        }
        Ok(())
    }

    /// Pass 2: honor cancellation requests, notifying both parties.
    async fn cancel_pass(&self) -> Result<()> {
        let requests = self.db.list_cancellation_requests().await?;

        for reservation in requests {
            let mut updated = reservation.clone();
            updated.cancellation_requested = false;

            if cancellation_due(&reservation) {
                updated.status = ReservationStatus::Cancelled;
            } else {
                // Too late to cancel; just clear the stale flag.
                tracing::debug!(
                    reservation_id = %reservation.id,
                    status = reservation.status.as_str(),
                    "Ignoring cancellation request on non-cancellable reservation"
                );
            }

            if let Err(e) = self.db.upsert_reservation(&updated).await {
                tracing::warn!(reservation_id = %reservation.id, error = %e, "Cancel write failed");
                continue;
            }

            if updated.status == ReservationStatus::Cancelled {
                if let Some(tour) = self.lookup_tour(&reservation).await {
                    let message = format!(
                        "Reservation for \"{}\" on {} has been cancelled",
                        tour.name,
                        reservation.date.to_rfc3339()
                    );
                    self.notify_parties(&reservation, &tour, &message).await;
                }
                tracing::info!(reservation_id = %reservation.id, "Reservation cancelled");
            }
        }
        Ok(())
    }

    /// Pass 3: move fully elapsed confirmed reservations to `completed`.
    async fn move_past_pass(&self, now: DateTime<Utc>) -> Result<()> {
        let confirmed = self.db.list_reservations_by_status("confirmed").await?;

        let mut items = Vec::with_capacity(confirmed.len());
        for reservation in confirmed {
            let tour = self.db.get_tour(&reservation.tour_id).await.ok().flatten();
            items.push((reservation, tour));
        }

        for updated in plan_completions(&items, now) {
            match self.db.upsert_reservation(&updated).await {
                Ok(()) => {
                    tracing::info!(reservation_id = %updated.id, "Reservation completed")
                }
                Err(e) => {
                    tracing::warn!(reservation_id = %updated.id, error = %e, "Completion write failed")
                }
            }
        }
        Ok(())
    }

    /// Pass 4: request reviews at the 1-hour and 1-week checkpoints.
    async fn review_request_pass(&self, now: DateTime<Utc>) -> Result<()> {
        let completed = self.db.list_reservations_by_status("completed").await?;

        for reservation in completed {
            let Some(tour) = self.lookup_tour(&reservation).await else {
                continue;
            };

            let end = tour_end(&reservation, tour.duration_hours);
            for checkpoint in due_review_checkpoints(&reservation, tour.duration_hours, now) {
                let threshold = checkpoint.threshold(end);
                // Atomic append-and-check: only notify if this run won
                // the race to record the request.
                match self
                    .db
                    .append_review_request_if_none_after(&reservation.id, threshold, now)
                    .await
                {
                    Ok(true) => {
                        self.notify_owner(
                            &reservation,
                            &format!(
                                "Please review your tour \"{}\" from {}",
                                tour.name,
                                reservation.date.to_rfc3339()
                            ),
                        )
                        .await;
                        tracing::info!(
                            reservation_id = %reservation.id,
                            checkpoint = ?checkpoint,
                            "Review request sent"
                        );
                    }
                    Ok(false) => {
                        tracing::debug!(
                            reservation_id = %reservation.id,
                            checkpoint = ?checkpoint,
                            "Review request already covered"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            reservation_id = %reservation.id,
                            error = %e,
                            "Review request append failed"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Pass 5: completed reservations with a written review move to `reviewed`.
    async fn move_reviewed_pass(&self) -> Result<()> {
        let completed = self.db.list_reservations_by_status("completed").await?;

        for reservation in completed {
            if !review_move_due(&reservation) {
                continue;
            }
            let mut updated = reservation.clone();
            updated.status = ReservationStatus::Reviewed;
            match self.db.upsert_reservation(&updated).await {
                Ok(()) => tracing::info!(reservation_id = %updated.id, "Reservation reviewed"),
                Err(e) => {
                    tracing::warn!(reservation_id = %updated.id, error = %e, "Reviewed write failed")
                }
            }
        }
        Ok(())
    }

    // ─── Helpers ─────────────────────────────────────────────────

    /// Fetch the reservation's tour; a missing tour is a per-item skip.
    async fn lookup_tour(&self, reservation: &Reservation) -> Option<Tour> {
        match self.db.get_tour(&reservation.tour_id).await {
            Ok(Some(tour)) => Some(tour),
            Ok(None) => {
                tracing::warn!(
                    reservation_id = %reservation.id,
                    tour_id = %reservation.tour_id,
                    "Tour missing, skipping reservation"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    reservation_id = %reservation.id,
                    error = %e,
                    "Tour lookup failed, skipping reservation"
                );
                None
            }
        }
    }

    /// Notify the owning user; a missing owner is logged, never fatal.
    async fn notify_owner(&self, reservation: &Reservation, message: &str) {
        match self.db.find_reservation_owner(&reservation.id).await {
            Ok(Some(owner)) => self.notifier.notify(&owner.email, message),
            Ok(None) => {
                tracing::warn!(reservation_id = %reservation.id, "No owner found for reservation")
            }
            Err(e) => {
                tracing::warn!(reservation_id = %reservation.id, error = %e, "Owner lookup failed")
            }
        }
    }

    /// Notify both the owning user and the tour's guide.
    async fn notify_parties(&self, reservation: &Reservation, tour: &Tour, message: &str) {
        self.notify_owner(reservation, message).await;

        match self.db.get_guide(&tour.guide_id).await {
            Ok(Some(guide)) => self.notifier.notify(&guide.email, message),
            Ok(None) => {
                tracing::warn!(tour_id = %tour.id, guide_id = %tour.guide_id, "Guide not found")
            }
            Err(e) => tracing::warn!(tour_id = %tour.id, error = %e, "Guide lookup failed"),
        }
    }
}
