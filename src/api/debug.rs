// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication diagnostics.
//!
//! `/auth-debug/headers` is public and decodes the presented token without
//! verifying it, so clients can inspect what they are sending.

use axum::{
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::auth::{CurrentUser, ResolvedIdentity};

/// Characters of the authorization header echoed back by `/auth-debug/headers`.
const AUTHORIZATION_PREVIEW_CHARS: usize = 16;

/// Response for `GET /auth-debug/me`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DebugMeResponse {
    pub user: ResolvedIdentity,
    /// Raw authorization header as received
    pub authorization: Option<String>,
}

/// Response for `GET /auth-debug/headers`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DebugHeadersResponse {
    /// First characters of the authorization header
    pub authorization: Option<String>,
    /// Decoded (unverified) token header
    #[schema(value_type = Option<Object>)]
    pub header: Option<Value>,
    /// Decoded (unverified) token payload
    #[schema(value_type = Option<Object>)]
    pub payload: Option<Value>,
}

fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

/// Decode one base64url JWT segment into a JSON object.
fn decode_segment(segment: &str) -> Option<Value> {
    let bytes = Base64UrlUnpadded::decode_vec(segment.trim_end_matches('=')).ok()?;
    serde_json::from_slice::<Value>(&bytes)
        .ok()
        .filter(Value::is_object)
}

fn preview(authorization: &str) -> String {
    let mut shown: String = authorization
        .chars()
        .take(AUTHORIZATION_PREVIEW_CHARS)
        .collect();
    shown.push('…');
    shown
}

/// Return the resolved identity together with the raw authorization header.
#[utoipa::path(
    get,
    path = "/auth-debug/me",
    tag = "Auth Debug",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Resolved identity", body = DebugMeResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn whoami(CurrentUser(user): CurrentUser, headers: HeaderMap) -> Json<DebugMeResponse> {
    Json(DebugMeResponse {
        user,
        authorization: authorization_header(&headers).map(str::to_string),
    })
}

/// Decode the presented token without verifying it.
#[utoipa::path(
    get,
    path = "/auth-debug/headers",
    tag = "Auth Debug",
    responses(
        (status = 200, description = "Decoded token parts", body = DebugHeadersResponse),
    )
)]
pub async fn headers(headers: HeaderMap) -> Json<DebugHeadersResponse> {
    let authorization = authorization_header(&headers);
    let token = authorization
        .and_then(|value| value.split_whitespace().nth(1))
        .filter(|token| token.contains('.'));

    let (header, payload) = match token {
        Some(token) => {
            let mut parts = token.split('.');
            let header = parts.next().and_then(decode_segment);
            let payload = parts.next().and_then(decode_segment);
            (header, payload)
        }
        None => (None, None),
    };

    Json(DebugHeadersResponse {
        authorization: authorization.map(preview),
        header,
        payload,
    })
}
