// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tourbook API Server
//!
//! Serves the tour/guide/reservation API and runs the reservation
//! lifecycle scheduler in the background.

use std::sync::Arc;
use std::time::Duration;
use tourbook::{
    config::Config,
    db::FirestoreDb,
    services::{BookingService, LifecycleScheduler, LogNotifier, SystemClock},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Tourbook API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Booking service (conflict-checked reservation creation)
    let booking = BookingService::new(db.clone());

    // Spawn the reservation lifecycle scheduler
    let notifier = Arc::new(LogNotifier::new(&config.notification_sender));
    let scheduler = Arc::new(LifecycleScheduler::new(
        db.clone(),
        notifier,
        Arc::new(SystemClock),
        Duration::from_secs(config.scheduler_interval_secs),
    ));
    scheduler.spawn();

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        booking,
    });

    // Build router
    let app = tourbook::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tourbook=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
