// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes: guide/tour/user CRUD and the reservation flow.
//!
//! Everything here is conventional plumbing around the booking service
//! and the lifecycle scheduler's data; handlers authenticate with a
//! user id (or email) plus password, matching the upstream product.

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{
    is_object_id, new_object_id,
    tour::validate_dates,
    user::{generate_salt, hash_password},
    GeoPoint, Guide, Review, Tour, TourDates, User,
};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Public API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/guides", get(list_guides).post(create_guide))
        .route("/guides/{guide_id}", get(get_guide))
        .route("/tours", get(list_tours).post(create_tour))
        .route("/tours/near", get(tours_near))
        .route("/tours/{tour_id}", get(get_tour))
        .route("/tours/{tour_id}/reserve", post(reserve_tour))
        .route("/users", post(create_user))
        .route(
            "/reservations/{reservation_id}/cancel",
            post(request_cancellation),
        )
        .route("/reservations/{reservation_id}/review", post(submit_review))
}

/// Common list query: `limit = 0` (default) means no limit.
#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    limit: u32,
}

/// Resolve a user by id or email and check their password.
async fn authenticate_user(db: &FirestoreDb, identifier: &str, password: &str) -> Result<User> {
    let user = if is_object_id(identifier) {
        db.get_user(identifier).await?
    } else {
        db.find_user_by_email(identifier).await?
    };

    let user = user.ok_or(AppError::Unauthorized)?;
    if !user.verify_password(password) {
        return Err(AppError::Unauthorized);
    }
    Ok(user)
}

/// Run validator checks, surfacing failures as 400s.
fn validated<T: Validate>(payload: T) -> Result<T> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(payload)
}

// ─── Guides ──────────────────────────────────────────────────────

async fn list_guides(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Guide>>> {
    Ok(Json(state.db.list_guides(query.limit).await?))
}

async fn get_guide(
    State(state): State<Arc<AppState>>,
    Path(guide_id): Path<String>,
) -> Result<Json<Guide>> {
    let guide = state
        .db
        .get_guide(&guide_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Guide {}", guide_id)))?;
    Ok(Json(guide))
}

/// Payload for registering an existing user as a guide.
#[derive(Deserialize, Validate)]
pub struct GuideRegisterRequest {
    pub user_id: String,
    pub password: String,
    #[validate(length(min = 1, message = "At least one language is required"))]
    pub languages: Vec<String>,
    pub bio: String,
}

/// Register the authenticated user as a guide. Contact details come
/// from the user record.
async fn create_guide(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GuideRegisterRequest>,
) -> Result<Json<String>> {
    let payload = validated(payload)?;
    let user = authenticate_user(&state.db, &payload.user_id, &payload.password).await?;

    let guide = Guide {
        id: new_object_id(),
        user_id: user.id.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
        phone: user.phone.clone(),
        languages: payload.languages,
        rating: None,
        bio: payload.bio,
    };
    state.db.upsert_guide(&guide).await?;

    tracing::info!(guide_id = %guide.id, user_id = %user.id, "Guide registered");
    Ok(Json(guide.id))
}

// ─── Tours ───────────────────────────────────────────────────────

async fn list_tours(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Tour>>> {
    Ok(Json(state.db.list_tours(query.limit).await?))
}

async fn get_tour(
    State(state): State<Arc<AppState>>,
    Path(tour_id): Path<String>,
) -> Result<Json<Tour>> {
    let tour = state
        .db
        .get_tour(&tour_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tour {}", tour_id)))?;
    Ok(Json(tour))
}

/// Payload for publishing a tour.
#[derive(Deserialize, Validate)]
pub struct CreateTourRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub description: String,
    pub location: GeoPoint,
    pub guide_id: String,
    #[validate(range(min = 0.0, message = "Guide salary cannot be negative"))]
    pub guide_salary: f64,
    #[validate(range(
        min = 0.0,
        max = 168.0,
        message = "Duration must be between 0 and 168 hours"
    ))]
    pub duration_hours: f64,
    pub dates: TourDates,
}

async fn create_tour(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateTourRequest>,
) -> Result<Json<String>> {
    let payload = validated(payload)?;
    validate_dates(&payload.dates)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if !is_object_id(&payload.guide_id) {
        return Err(AppError::BadRequest("Invalid guide_id".to_string()));
    }
    if state.db.get_guide(&payload.guide_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Guide {}", payload.guide_id)));
    }

    let tour = Tour {
        id: new_object_id(),
        name: payload.name,
        description: payload.description,
        location: payload.location,
        guide_id: payload.guide_id,
        rating: None,
        guide_salary: payload.guide_salary,
        duration_hours: payload.duration_hours,
        dates: payload.dates,
    };
    state.db.upsert_tour(&tour).await?;

    tracing::info!(tour_id = %tour.id, guide_id = %tour.guide_id, "Tour published");
    Ok(Json(tour.id))
}

/// Query for tours near a point. Radius is kilometers (default 10).
#[derive(Deserialize)]
struct NearQuery {
    lat: f64,
    lon: f64,
    #[serde(default = "default_radius_km")]
    radius_km: f64,
    #[serde(default)]
    limit: usize,
}

fn default_radius_km() -> f64 {
    10.0
}

async fn tours_near(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NearQuery>,
) -> Result<Json<Vec<Tour>>> {
    let radius_meters = query.radius_km * 1000.0;
    let tours = state
        .db
        .find_tours_near(query.lat, query.lon, radius_meters, query.limit)
        .await?;
    Ok(Json(tours))
}

// ─── Users ───────────────────────────────────────────────────────

/// Registration payload.
#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub phone: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    pub repeat_password: String,
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<String>> {
    let payload = validated(payload)?;

    if payload.password != payload.repeat_password {
        return Err(AppError::BadRequest("Passwords don't match".to_string()));
    }
    if state
        .db
        .find_user_by_email(&payload.email)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }

    let salt = generate_salt();
    let user = User {
        id: new_object_id(),
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        hashed_password: hash_password(&payload.password, &salt),
        salt,
        reservation_ids: Vec::new(),
        created_at: Utc::now().to_rfc3339(),
    };
    state.db.upsert_user(&user).await?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok(Json(user.id))
}

// ─── Reservations ────────────────────────────────────────────────

/// Payload for reserving a tour slot.
#[derive(Deserialize)]
pub struct ReserveRequest {
    /// User id or email
    pub user: String,
    pub password: String,
    /// Chosen start instant
    pub date: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ReserveResponse {
    pub reservation_id: String,
}

async fn reserve_tour(
    State(state): State<Arc<AppState>>,
    Path(tour_id): Path<String>,
    Json(payload): Json<ReserveRequest>,
) -> Result<Json<ReserveResponse>> {
    let user = authenticate_user(&state.db, &payload.user, &payload.password).await?;

    let tour = state
        .db
        .get_tour(&tour_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tour {}", tour_id)))?;

    let reservation = state
        .booking
        .reserve(&user, &tour, payload.date, Utc::now())
        .await?;

    Ok(Json(ReserveResponse {
        reservation_id: reservation.id,
    }))
}

/// Credentials accompanying a reservation action.
#[derive(Deserialize)]
pub struct ReservationActionRequest {
    pub user: String,
    pub password: String,
}

/// Flag a reservation for cancellation; the lifecycle scheduler
/// performs the actual transition and notifications.
async fn request_cancellation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<String>,
    Json(payload): Json<ReservationActionRequest>,
) -> Result<Json<String>> {
    let user = authenticate_user(&state.db, &payload.user, &payload.password).await?;

    if !user.reservation_ids.contains(&reservation_id) {
        return Err(AppError::NotFound(format!(
            "Reservation {}",
            reservation_id
        )));
    }

    let mut reservation = state
        .db
        .get_reservation(&reservation_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reservation {}", reservation_id)))?;

    if !reservation.status.cancellable() {
        return Err(AppError::BadRequest(
            "Reservation can no longer be cancelled".to_string(),
        ));
    }

    reservation.cancellation_requested = true;
    state.db.upsert_reservation(&reservation).await?;

    tracing::info!(reservation_id = %reservation.id, "Cancellation requested");
    Ok(Json(reservation.id))
}

/// Payload for submitting a review.
#[derive(Deserialize, Validate)]
pub struct ReviewRequest {
    pub user: String,
    pub password: String,
    #[validate(range(min = 1.0, max = 5.0, message = "Rating must be between 1 and 5"))]
    pub rating: f64,
    pub body: String,
}

async fn submit_review(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<String>,
    Json(payload): Json<ReviewRequest>,
) -> Result<Json<String>> {
    let payload = validated(payload)?;
    let user = authenticate_user(&state.db, &payload.user, &payload.password).await?;

    if !user.reservation_ids.contains(&reservation_id) {
        return Err(AppError::NotFound(format!(
            "Reservation {}",
            reservation_id
        )));
    }

    let mut reservation = state
        .db
        .get_reservation(&reservation_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reservation {}", reservation_id)))?;

    if reservation.status != crate::models::ReservationStatus::Completed {
        return Err(AppError::BadRequest(
            "Only completed reservations can be reviewed".to_string(),
        ));
    }
    if reservation.review_id.is_some() {
        return Err(AppError::Conflict(
            "Reservation already reviewed".to_string(),
        ));
    }

    let review = Review {
        id: new_object_id(),
        reservation_id: reservation.id.clone(),
        author_id: user.id.clone(),
        rating: payload.rating,
        body: payload.body,
        date: Utc::now().to_rfc3339(),
    };
    state.db.upsert_review(&review).await?;

    reservation.review_id = Some(review.id.clone());
    state.db.upsert_reservation(&reservation).await?;

    tracing::info!(
        reservation_id = %reservation.id,
        review_id = %review.id,
        "Review submitted"
    );
    Ok(Json(review.id))
}
