// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and the resolved identity derived from them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::AuthError;

/// Free-form metadata object attached to a Supabase user.
pub type Metadata = Map<String, Value>;

/// `aud` may be a single string or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    /// The audience used for the resolved identity (first entry of a list).
    pub fn primary(&self) -> Option<&str> {
        match self {
            Audience::One(aud) => Some(aud.as_str()),
            Audience::Many(auds) => auds.first().map(String::as_str),
        }
    }
}

/// Claims carried by a Supabase access token (or attested by the provider).
///
/// Unknown claims are kept in `extra` so the full set can be retained for
/// auditing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject (user ID). Required; checked by [`validate`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    /// Expiration timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Supabase role (`authenticated`, `anon`, `service_role`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Application-controlled metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_metadata: Option<Metadata>,

    /// User-controlled metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<Metadata>,

    #[serde(flatten)]
    pub extra: Metadata,
}

/// Identity resolved from verified claims.
///
/// Built once per request by either verification path and attached to the
/// request extensions. `raw_claims` is for debugging and audit only and is
/// never re-validated.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedIdentity {
    /// Provider user ID (`sub`)
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub app_metadata: Option<Metadata>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub user_metadata: Option<Metadata>,

    #[schema(value_type = Object)]
    pub raw_claims: IdentityClaims,
}

/// Validate a decoded payload and map it into a [`ResolvedIdentity`].
///
/// Fails with [`AuthError::MalformedClaims`] when the subject is missing or
/// blank. Otherwise a pure field mapping.
pub fn validate(claims: IdentityClaims) -> Result<ResolvedIdentity, AuthError> {
    let id = match claims.sub.as_deref() {
        Some(sub) if !sub.trim().is_empty() => sub.to_string(),
        _ => {
            return Err(AuthError::MalformedClaims(
                "token payload has no subject".to_string(),
            ))
        }
    };

    Ok(ResolvedIdentity {
        id,
        email: claims.email.clone(),
        role: claims.role.clone(),
        aud: claims.aud.as_ref().and_then(Audience::primary).map(str::to_string),
        app_metadata: claims.app_metadata.clone(),
        user_metadata: claims.user_metadata.clone(),
        raw_claims: claims,
    })
}
