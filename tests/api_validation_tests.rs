// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request validation tests that run against the offline app: every
//! request here must be rejected before any database access happens.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt; // for oneshot

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_register_rejects_mismatched_passwords() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/users",
            json!({
                "name": "testname",
                "email": "a@gmail.com",
                "phone": "054",
                "password": "123",
                "repeat_password": "456"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_rejects_invalid_email() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/users",
            json!({
                "name": "testname",
                "email": "not-an-email",
                "phone": "054",
                "password": "123",
                "repeat_password": "123"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_tour_rejects_negative_duration() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/tours",
            json!({
                "name": "City walk",
                "description": "A walk",
                "location": { "lon": 34.78, "lat": 32.08 },
                "guide_id": "aaaaaaaaaaaaaaaaaaaaaaaa",
                "guide_salary": 100.0,
                "duration_hours": -1.5,
                "dates": ["2999-01-01T10:00:00Z"]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_tour_rejects_oversized_duration() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/tours",
            json!({
                "name": "City walk",
                "description": "A walk",
                "location": { "lon": 34.78, "lat": 32.08 },
                "guide_id": "aaaaaaaaaaaaaaaaaaaaaaaa",
                "guide_salary": 100.0,
                "duration_hours": 1e18,
                "dates": ["2999-01-01T10:00:00Z"]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_tour_rejects_past_dates() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/tours",
            json!({
                "name": "City walk",
                "description": "A walk",
                "location": { "lon": 34.78, "lat": 32.08 },
                "guide_id": "aaaaaaaaaaaaaaaaaaaaaaaa",
                "guide_salary": 100.0,
                "duration_hours": 1.5,
                "dates": ["2001-01-01T10:00:00Z"]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_tour_rejects_malformed_guide_id() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/tours",
            json!({
                "name": "City walk",
                "description": "A walk",
                "location": { "lon": 34.78, "lat": 32.08 },
                "guide_id": "nope",
                "guide_salary": 100.0,
                "duration_hours": 1.5,
                "dates": ["2999-01-01T10:00:00Z"]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // Security headers apply to every response.
    assert_eq!(
        response.headers().get("X-Content-Type-Options").unwrap(),
        "nosniff"
    );
}
