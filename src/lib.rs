// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Tourbook: tour-booking platform backend
//!
//! Guides publish tours, users reserve them, and a periodic lifecycle
//! scheduler confirms, cancels, completes, and solicits reviews for
//! reservations over time.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::FirestoreDb;
use services::BookingService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub booking: BookingService,
}
