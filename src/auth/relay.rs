// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request-scoped credential relay.
//!
//! Carries the raw bearer credential from the request-entry interceptor to the
//! authorization guard. The relay lives in the request's own extensions, so a
//! credential can never be observed by another in-flight request.

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::AuthError;

/// Single-slot credential holder for one request.
///
/// Not a queue: a second [`set`](Self::set) before a
/// [`consume`](Self::consume) replaces the previous value.
#[derive(Clone, Default)]
pub struct CredentialRelay {
    slot: Option<String>,
}

impl CredentialRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a credential, overwriting any unconsumed value.
    pub fn set(&mut self, token: impl Into<String>) {
        self.slot = Some(token.into());
    }

    /// Current credential, without clearing it.
    pub fn peek(&self) -> Option<&str> {
        self.slot.as_deref()
    }

    /// Take the credential, leaving the slot empty.
    pub fn consume(&mut self) -> Option<String> {
        self.slot.take()
    }

    /// Empty the slot.
    pub fn clear(&mut self) {
        self.slot = None;
    }
}

// Never print the credential itself.
impl std::fmt::Debug for CredentialRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRelay")
            .field("occupied", &self.slot.is_some())
            .finish()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively. Returns `None` for a missing,
/// non-UTF-8, non-bearer or empty header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(char::is_whitespace)?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The bearer token a request presents.
///
/// Fails with [`AuthError::MissingCredential`] when there is no
/// `Authorization` header and [`AuthError::InvalidAuthHeader`] when the header
/// is not `Bearer <token>`.
pub fn presented_credential(headers: &HeaderMap) -> Result<&str, AuthError> {
    if !headers.contains_key(AUTHORIZATION) {
        return Err(AuthError::MissingCredential);
    }
    bearer_token(headers).ok_or(AuthError::InvalidAuthHeader)
}

/// Interceptor: place the request's bearer credential into its relay.
pub async fn capture_credential(mut request: Request, next: Next) -> Response {
    let mut relay = CredentialRelay::new();
    if let Some(token) = bearer_token(request.headers()) {
        relay.set(token);
    }
    request.extensions_mut().insert(relay);

    next.run(request).await
}
