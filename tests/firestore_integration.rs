// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end booking and lifecycle tests against the Firestore
//! emulator. Skipped unless FIRESTORE_EMULATOR_HOST is set.

mod common;

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tourbook::db::FirestoreDb;
use tourbook::error::AppError;
use tourbook::models::{
    new_object_id,
    user::{generate_salt, hash_password},
    GeoPoint, Guide, Reservation, ReservationStatus, Tour, TourDates, User,
};
use tourbook::services::lifecycle::{FixedClock, LifecycleScheduler};
use tourbook::services::notify::RecordingNotifier;
use tourbook::services::BookingService;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
}

async fn seed_user(db: &FirestoreDb) -> User {
    let id = new_object_id();
    let salt = generate_salt();
    let user = User {
        id: id.clone(),
        name: "Test User".to_string(),
        email: format!("user-{}@example.com", id),
        phone: "054".to_string(),
        hashed_password: hash_password("123", &salt),
        salt,
        reservation_ids: Vec::new(),
        created_at: Utc::now().to_rfc3339(),
    };
    db.upsert_user(&user).await.expect("seed user");
    user
}

async fn seed_guide(db: &FirestoreDb, user: &User) -> Guide {
    let guide = Guide {
        id: new_object_id(),
        user_id: user.id.clone(),
        name: user.name.clone(),
        email: format!("guide-{}@example.com", user.id),
        phone: user.phone.clone(),
        languages: vec!["eng".to_string()],
        rating: None,
        bio: "hi there".to_string(),
    };
    db.upsert_guide(&guide).await.expect("seed guide");
    guide
}

async fn seed_tour(db: &FirestoreDb, guide: &Guide, duration_hours: f64) -> Tour {
    let tour = Tour {
        id: new_object_id(),
        name: "Old town walk".to_string(),
        description: "A walk through the old town".to_string(),
        location: GeoPoint {
            lon: 34.78,
            lat: 32.08,
        },
        guide_id: guide.id.clone(),
        rating: None,
        guide_salary: 100.0,
        duration_hours,
        dates: TourDates::Explicit(vec![t0()]),
    };
    db.upsert_tour(&tour).await.expect("seed tour");
    tour
}

fn scheduler_at(
    db: &FirestoreDb,
    notifier: Arc<RecordingNotifier>,
    now: DateTime<Utc>,
) -> LifecycleScheduler {
    LifecycleScheduler::new(
        db.clone(),
        notifier,
        Arc::new(FixedClock(now)),
        Duration::from_secs(300),
    )
}

fn messages_for<'a>(sent: &'a [(String, String)], recipient: &str) -> Vec<&'a str> {
    sent.iter()
        .filter(|(to, _)| to == recipient)
        .map(|(_, msg)| msg.as_str())
        .collect()
}

#[tokio::test]
async fn test_overlapping_reservation_rejected() {
    require_emulator!();
    let db = common::test_db().await;
    let booking = BookingService::new(db.clone());

    let user = seed_user(&db).await;
    let guide = seed_guide(&db, &user).await;
    let tour = seed_tour(&db, &guide, 2.0).await;

    let now = Utc::now();
    booking
        .reserve(&user, &tour, t0(), now)
        .await
        .expect("first reservation");

    // Re-read the user: reserve() appended the reservation id.
    let user = db.get_user(&user.id).await.unwrap().expect("user exists");
    assert_eq!(user.reservation_ids.len(), 1);

    // One hour into the first tour: conflict.
    let overlap = booking
        .reserve(&user, &tour, t0() + chrono::Duration::hours(1), now)
        .await;
    assert!(matches!(overlap, Err(AppError::Conflict(_))));

    // Three hours later (tour ended at +2h, closed endpoint at +2h):
    // +3h is clear.
    booking
        .reserve(&user, &tour, t0() + chrono::Duration::hours(3), now)
        .await
        .expect("disjoint reservation");
}

#[tokio::test]
async fn test_lifecycle_confirm_complete_and_review_requests() {
    require_emulator!();
    let db = common::test_db().await;
    let booking = BookingService::new(db.clone());
    let notifier = Arc::new(RecordingNotifier::default());

    let user = seed_user(&db).await;
    let guide = seed_guide(&db, &user).await;
    let tour = seed_tour(&db, &guide, 2.5).await;

    let reservation = booking
        .reserve(&user, &tour, t0(), t0() - chrono::Duration::days(1))
        .await
        .expect("reservation");

    let fetch = |id: String| {
        let db = db.clone();
        async move {
            db.get_reservation(&id)
                .await
                .unwrap()
                .expect("reservation exists")
        }
    };

    // Before the tour date nothing moves.
    scheduler_at(&db, notifier.clone(), t0() - chrono::Duration::minutes(5))
        .run_once()
        .await;
    assert_eq!(
        fetch(reservation.id.clone()).await.status,
        ReservationStatus::Pending
    );

    // At the tour date: confirmed, both parties notified.
    scheduler_at(&db, notifier.clone(), t0()).run_once().await;
    let r: Reservation = fetch(reservation.id.clone()).await;
    assert_eq!(r.status, ReservationStatus::Confirmed);
    assert!(r.notified);
    let sent = notifier.sent();
    assert_eq!(messages_for(&sent, &user.email).len(), 1);
    assert_eq!(messages_for(&sent, &guide.email).len(), 1);

    // Tour ends at t0 + 2.5h; the same instant completes it (closed bound).
    let end = t0() + chrono::Duration::minutes(150);
    scheduler_at(&db, notifier.clone(), end).run_once().await;
    assert_eq!(
        fetch(reservation.id.clone()).await.status,
        ReservationStatus::Completed
    );

    // end + 59 min: the one-hour checkpoint is not yet due.
    scheduler_at(&db, notifier.clone(), end + chrono::Duration::minutes(59))
        .run_once()
        .await;
    assert!(fetch(reservation.id.clone()).await.review_requests.is_empty());

    // end + 1h: one review request, recorded on the reservation.
    let checkpoint_one = end + chrono::Duration::hours(1);
    scheduler_at(&db, notifier.clone(), checkpoint_one)
        .run_once()
        .await;
    let r = fetch(reservation.id.clone()).await;
    assert_eq!(r.review_requests.len(), 1);

    // Re-running without advancing the clock must not double-send.
    scheduler_at(&db, notifier.clone(), checkpoint_one)
        .run_once()
        .await;
    assert_eq!(fetch(reservation.id.clone()).await.review_requests.len(), 1);

    // end + 1 week: the second, independent checkpoint fires.
    scheduler_at(&db, notifier.clone(), end + chrono::Duration::weeks(1))
        .run_once()
        .await;
    let r = fetch(reservation.id.clone()).await;
    assert_eq!(r.review_requests.len(), 2);

    let sent = notifier.sent();
    let review_requests = messages_for(&sent, &user.email)
        .into_iter()
        .filter(|m| m.contains("review"))
        .count();
    assert_eq!(review_requests, 2);
}

#[tokio::test]
async fn test_cancellation_request_processed_by_scheduler() {
    require_emulator!();
    let db = common::test_db().await;
    let booking = BookingService::new(db.clone());
    let notifier = Arc::new(RecordingNotifier::default());

    let user = seed_user(&db).await;
    let guide = seed_guide(&db, &user).await;
    let tour = seed_tour(&db, &guide, 2.0).await;

    let reservation = booking
        .reserve(&user, &tour, t0(), t0() - chrono::Duration::days(1))
        .await
        .expect("reservation");

    let mut flagged = db
        .get_reservation(&reservation.id)
        .await
        .unwrap()
        .expect("reservation exists");
    flagged.cancellation_requested = true;
    db.upsert_reservation(&flagged).await.unwrap();

    // Scheduler runs before the tour date: still pending, so cancellable.
    scheduler_at(&db, notifier.clone(), t0() - chrono::Duration::hours(1))
        .run_once()
        .await;

    let r = db
        .get_reservation(&reservation.id)
        .await
        .unwrap()
        .expect("reservation exists");
    assert_eq!(r.status, ReservationStatus::Cancelled);
    assert!(!r.cancellation_requested);

    let sent = notifier.sent();
    assert!(messages_for(&sent, &user.email)
        .iter()
        .any(|m| m.contains("cancelled")));
    assert!(messages_for(&sent, &guide.email)
        .iter()
        .any(|m| m.contains("cancelled")));
}
