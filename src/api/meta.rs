// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use chrono::Utc;

use crate::models::ApiMetadata;
use crate::state::AppState;

/// Service name, version and uptime.
#[utoipa::path(
    get,
    path = "/",
    tag = "Meta",
    responses(
        (status = 200, description = "Service metadata", body = ApiMetadata)
    )
)]
pub async fn api_metadata(State(state): State<AppState>) -> Json<ApiMetadata> {
    let app = &state.config.app;
    Json(ApiMetadata {
        name: app.name.clone(),
        description: app.description.clone(),
        version: app.version.clone(),
        environment: app.environment.as_str().to_string(),
        uptime: state.uptime().as_secs(),
        timestamp: Utc::now(),
    })
}
