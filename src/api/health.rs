// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Basic health response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub environment: String,
    pub service: String,
    pub time: DateTime<Utc>,
}

/// Liveness response.
#[derive(Debug, Serialize, ToSchema)]
pub struct LivenessResponse {
    pub status: String,
    /// Seconds since the server started
    pub uptime: u64,
}

/// Readiness response with individual dependency status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall status ("ready" or "degraded").
    pub status: String,
    pub checks: ReadinessChecks,
}

/// Individual readiness check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadinessChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Supabase Auth fallback configuration.
    pub supabase_auth: String,
    /// JWKS (signing keys) status.
    /// Only present when keys come from a JWKS endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<String>,
}

/// Check if JWKS is available.
///
/// Fetches at most once per refresh interval, however often it is polled.
async fn check_jwks(state: &AppState) -> Option<String> {
    let jwks_manager = state.strategy.jwks()?;

    match jwks_manager.ensure_fresh().await {
        Ok(()) => Some("ok".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, url = jwks_manager.jwks_url(), "JWKS unavailable");
            Some("unavailable".to_string())
        }
    }
}

/// Health check endpoint handler.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        environment: state.config.app.environment.as_str().to_string(),
        service: state.config.app.name.clone(),
        time: Utc::now(),
    })
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = LivenessResponse)
    )
)]
pub async fn liveness(State(state): State<AppState>) -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "live".to_string(),
        uptime: state.uptime().as_secs(),
    })
}

/// Readiness probe handler.
///
/// Returns 503 when signing keys cannot be fetched.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let jwks = check_jwks(&state).await;
    let supabase = &state.config.supabase;
    let supabase_auth = if supabase.service_role_key.is_empty() {
        "missing"
    } else {
        "ok"
    };

    let ready = jwks.as_deref().is_none_or(|status| status == "ok") && supabase_auth == "ok";

    let response = ReadyResponse {
        status: if ready { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            service: "ok".to_string(),
            supabase_auth: supabase_auth.to_string(),
            jwks,
        },
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
