// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profiles, credentials, reservation ownership)
//! - Guides (public guide profiles)
//! - Tours (tour catalog, geo lookups)
//! - Reservations (lifecycle records driven by the scheduler)
//! - Reviews

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Guide, Reservation, Review, Tour, User};
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use geo::{Distance, Haversine, Point};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by document id.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by email (registration uniqueness, login by email).
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("email").eq(email.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.into_iter().next())
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Find the user owning a reservation by scanning `reservation_ids`.
    pub async fn find_reservation_owner(
        &self,
        reservation_id: &str,
    ) -> Result<Option<User>, AppError> {
        let reservation_id = reservation_id.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| {
                q.field("reservation_ids")
                    .array_contains(reservation_id.clone())
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.into_iter().next())
    }

    // ─── Guide Operations ────────────────────────────────────────

    /// Get a guide by document id.
    pub async fn get_guide(&self, guide_id: &str) -> Result<Option<Guide>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::GUIDES)
            .obj()
            .one(guide_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List guides; `limit = 0` means no limit.
    pub async fn list_guides(&self, limit: u32) -> Result<Vec<Guide>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::GUIDES);
        let query = if limit > 0 { query.limit(limit) } else { query };
        query
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a guide.
    pub async fn upsert_guide(&self, guide: &Guide) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::GUIDES)
            .document_id(&guide.id)
            .object(guide)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Tour Operations ─────────────────────────────────────────

    /// Get a tour by document id.
    pub async fn get_tour(&self, tour_id: &str) -> Result<Option<Tour>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::TOURS)
            .obj()
            .one(tour_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List tours; `limit = 0` means no limit.
    pub async fn list_tours(&self, limit: u32) -> Result<Vec<Tour>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::TOURS);
        let query = if limit > 0 { query.limit(limit) } else { query };
        query
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a tour.
    pub async fn upsert_tour(&self, tour: &Tour) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::TOURS)
            .document_id(&tour.id)
            .object(tour)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Find tours whose meeting point is within `radius_meters` of a point.
    ///
    /// Firestore has no geo queries, so this filters the catalog by
    /// haversine distance after fetching. Fine at catalog scale; a geo
    /// index would be the next step if the catalog outgrows it.
    pub async fn find_tours_near(
        &self,
        lat: f64,
        lon: f64,
        radius_meters: f64,
        limit: usize,
    ) -> Result<Vec<Tour>, AppError> {
        let origin = Point::new(lon, lat);
        let tours = self.list_tours(0).await?;

        let mut near: Vec<Tour> = tours
            .into_iter()
            .filter(|t| {
                let p = Point::new(t.location.lon, t.location.lat);
                Haversine.distance(origin, p) <= radius_meters
            })
            .collect();

        if limit > 0 {
            near.truncate(limit);
        }
        Ok(near)
    }

    // ─── Reservation Operations ──────────────────────────────────

    /// Get a reservation by document id.
    pub async fn get_reservation(
        &self,
        reservation_id: &str,
    ) -> Result<Option<Reservation>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::RESERVATIONS)
            .obj()
            .one(reservation_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a reservation.
    pub async fn upsert_reservation(&self, reservation: &Reservation) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::RESERVATIONS)
            .document_id(&reservation.id)
            .object(reservation)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// All reservations currently in `status`.
    pub async fn list_reservations_by_status(
        &self,
        status: &'static str,
    ) -> Result<Vec<Reservation>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::RESERVATIONS)
            .filter(move |q| q.field("status").eq(status))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Reservations flagged for cancellation (any status; the pass
    /// decides which are still cancellable).
    pub async fn list_cancellation_requests(&self) -> Result<Vec<Reservation>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::RESERVATIONS)
            .filter(|q| q.field("cancellation_requested").eq(true))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Resolve a user's reservations from its `reservation_ids`.
    ///
    /// Fetches concurrently with a bound to avoid overloading Firestore.
    /// A dangling id (deleted reservation) is skipped with a warning.
    pub async fn reservations_for_user(&self, user: &User) -> Result<Vec<Reservation>, AppError> {
        let fetched: Vec<Result<Option<Reservation>, AppError>> =
            stream::iter(user.reservation_ids.clone())
                .map(|rid| async move { self.get_reservation(&rid).await })
                .buffer_unordered(MAX_CONCURRENT_DB_OPS)
                .collect()
                .await;

        let mut reservations = Vec::with_capacity(fetched.len());
        for result in fetched {
            match result? {
                Some(r) => reservations.push(r),
                None => tracing::warn!(user_id = %user.id, "Dangling reservation id on user"),
            }
        }
        Ok(reservations)
    }

    /// Append a review-request timestamp unless one at or past
    /// `threshold` is already recorded.
    ///
    /// Runs inside a Firestore transaction: the reservation is re-read
    /// and the threshold re-checked against fresh data before the write,
    /// so two interleaved scheduler runs cannot both append for the same
    /// checkpoint.
    ///
    /// Returns `true` if a timestamp was appended.
    pub async fn append_review_request_if_none_after(
        &self,
        reservation_id: &str,
        threshold: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Re-read fresh state; registers the document for conflict detection.
        let reservation: Option<Reservation> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::RESERVATIONS)
            .obj()
            .one(reservation_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read reservation in transaction: {}", e))
            })?;

        let Some(mut reservation) = reservation else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound(format!(
                "Reservation {}",
                reservation_id
            )));
        };

        if reservation.review_requests.iter().any(|t| *t >= threshold) {
            // A concurrent run already covered this checkpoint.
            let _ = transaction.rollback().await;
            return Ok(false);
        }

        reservation.review_requests.push(now);

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::RESERVATIONS)
            .document_id(reservation_id)
            .object(&reservation)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add reservation to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(true)
    }

    // ─── Review Operations ───────────────────────────────────────

    /// Store a review.
    pub async fn upsert_review(&self, review: &Review) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::REVIEWS)
            .document_id(&review.id)
            .object(review)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
