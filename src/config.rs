// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;

/// Reference cadence for the reservation lifecycle scheduler.
pub const DEFAULT_SCHEDULER_INTERVAL_SECS: u64 = 5 * 60;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID (Firestore). "local-dev" + emulator for development.
    pub gcp_project_id: String,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Seconds between lifecycle scheduler runs
    pub scheduler_interval_secs: u64,
    /// Sender address used in outgoing notifications
    pub notification_sender: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: parse_env("PORT", 8080)?,
            scheduler_interval_secs: parse_env(
                "SCHEDULER_INTERVAL_SECS",
                DEFAULT_SCHEDULER_INTERVAL_SECS,
            )?,
            notification_sender: env::var("NOTIFICATION_SENDER")
                .unwrap_or_else(|_| "noreply@tourbook.example".to_string()),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            scheduler_interval_secs: DEFAULT_SCHEDULER_INTERVAL_SECS,
            notification_sender: "noreply@tourbook.example".to_string(),
        }
    }
}

/// Parse an optional numeric environment variable, rejecting malformed values.
fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Malformed environment variable: {0}")]
    Invalid(&'static str),
}
