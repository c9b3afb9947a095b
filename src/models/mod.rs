// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod guide;
pub mod reservation;
pub mod review;
pub mod tour;
pub mod user;

pub use guide::Guide;
pub use reservation::{Reservation, ReservationStatus};
pub use review::Review;
pub use tour::{GeoPoint, PeriodicSchedule, Tour, TourDates};
pub use user::User;

use ring::rand::{SecureRandom, SystemRandom};

/// Generate a fresh document id (24 lowercase hex chars).
pub fn new_object_id() -> String {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; 12];
    // rng.fill only fails if the system RNG is broken; fall back to a
    // timestamp-derived id rather than panicking in a request path.
    if rng.fill(&mut bytes).is_err() {
        return format!("{:024x}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0));
    }
    hex::encode(bytes)
}

/// Whether a string has the shape of a document id.
pub fn is_object_id(s: &str) -> bool {
    s.len() == 24 && s.chars().all(|c| c.is_ascii_hexdigit())
}
