// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{extract::State, Json};

use crate::auth::CurrentUser;
use crate::models::CurrentUserResponse;
use crate::state::AppState;

/// Get the current authenticated user.
///
/// The local user record is created on first access and refreshed from the
/// identity on every later one.
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User information", body = CurrentUserResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Json<CurrentUserResponse> {
    let user = state.store.write().await.ensure_user(&identity);
    Json(CurrentUserResponse { user, identity })
}
