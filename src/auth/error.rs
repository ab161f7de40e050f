// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Every variant renders as the same `401` response. The variant is kept
//! for logging only, so callers probing credentials learn nothing about
//! which verification path failed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No credential found for a protected route
    #[error("Authorization header is required")]
    MissingCredential,
    /// Authorization header is not `Bearer <token>`
    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,
    /// Token could not be decoded
    #[error("Token is malformed")]
    MalformedToken,
    /// Token signature is invalid
    #[error("Token signature is invalid")]
    InvalidSignature,
    /// Token has expired
    #[error("Token has expired")]
    ExpiredToken,
    /// Token is not yet valid
    #[error("Token is not yet valid")]
    TokenNotYetValid,
    /// Token issuer is invalid
    #[error("Token issuer is invalid")]
    InvalidIssuer,
    /// Token audience is invalid
    #[error("Token audience is invalid")]
    InvalidAudience,
    /// Verified payload is missing a subject
    #[error("Token claims are malformed: {0}")]
    MalformedClaims(String),
    /// No matching key in JWKS
    #[error("No matching key found in JWKS")]
    NoMatchingKey,
    /// JWKS fetch failed
    #[error("Failed to fetch JWKS: {0}")]
    JwksFetch(String),
    /// Identity provider could not be reached
    #[error("Identity provider unreachable: {0}")]
    ProviderUnreachable(String),
    /// Identity provider rejected the token
    #[error("Identity provider rejected the token")]
    ProviderRejected,
    /// Generic rejection with no more specific cause
    #[error("Authentication failed")]
    Unauthenticated,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
    error_code: &'static str,
}

impl AuthError {
    /// Internal error code, used in log fields.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::ExpiredToken => "expired_token",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::MalformedClaims(_) => "malformed_claims",
            AuthError::NoMatchingKey => "no_matching_key",
            AuthError::JwksFetch(_) => "jwks_fetch_error",
            AuthError::ProviderUnreachable(_) => "provider_unreachable",
            AuthError::ProviderRejected => "provider_rejected",
            AuthError::Unauthenticated => "unauthenticated",
        }
    }

    /// Map a `jsonwebtoken` failure onto the stateless-path variants.
    pub(crate) fn from_jwt(err: &jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
            ErrorKind::InvalidAudience => AuthError::InvalidAudience,
            ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            _ => AuthError::MalformedToken,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::debug!(error_code = self.error_code(), cause = %self, "Rejecting request");

        let body = Json(AuthErrorBody {
            error: "Authentication failed",
            error_code: "unauthenticated",
        });
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}
