// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Response types shared by the REST handlers. All types derive `Serialize`
//! and `ToSchema` for JSON handling and OpenAPI documentation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::ResolvedIdentity;

// =============================================================================
// Users
// =============================================================================

/// Local user record, keyed by the provider subject.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InternalUser {
    /// Local identifier
    pub id: Uuid,
    /// Provider subject (`sub`)
    pub external_id: String,
    /// Normalized (trimmed, lower-case) email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response for `GET /users/me`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentUserResponse {
    /// Local user record (created on first request)
    pub user: InternalUser,
    /// Identity resolved from the bearer credential
    pub identity: ResolvedIdentity,
}

// =============================================================================
// Service metadata
// =============================================================================

/// Response for the API root.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiMetadata {
    pub name: String,
    pub description: String,
    pub version: String,
    pub environment: String,
    /// Seconds since the server started
    pub uptime: u64,
    pub timestamp: DateTime<Utc>,
}
