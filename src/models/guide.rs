// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Guide model.

use serde::{Deserialize, Serialize};

/// Guide profile stored in Firestore.
///
/// A guide is always backed by a registered user (`user_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guide {
    /// Document id
    pub id: String,
    /// User acting as this guide
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Languages the guide offers tours in
    pub languages: Vec<String>,
    /// Average review rating across the guide's tours
    pub rating: Option<f64>,
    pub bio: String,
}
