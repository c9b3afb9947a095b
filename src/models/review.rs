// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Review model.

use serde::{Deserialize, Serialize};

/// Review written by a user after a completed reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    /// Document id
    pub id: String,
    /// Reservation being reviewed
    pub reservation_id: String,
    /// User who wrote the review
    pub author_id: String,
    /// Rating from 1 to 5
    pub rating: f64,
    pub body: String,
    /// When the review was submitted (RFC3339)
    pub date: String,
}
