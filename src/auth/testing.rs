// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token helpers shared by the auth and API tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use super::{claims, IdentityClaims, IdentityProvider, JwtStrategy, KeySource, ResolvedIdentity};

pub const SECRET: &str = "test-jwt-secret-with-enough-entropy";

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Claims for a token valid for the next hour.
pub fn valid_claims(sub: &str) -> Value {
    json!({
        "sub": sub,
        "email": format!("{sub}@example.com"),
        "role": "authenticated",
        "aud": "authenticated",
        "iat": now(),
        "exp": now() + 3600,
        "app_metadata": { "provider": "email" },
        "user_metadata": { "full_name": "Test User" }
    })
}

/// Sign `claims` with [`SECRET`] (HS256).
pub fn mint(claims: &Value) -> String {
    mint_with(claims, SECRET)
}

pub fn mint_with(claims: &Value, secret: &str) -> String {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

pub fn secret_strategy() -> JwtStrategy {
    JwtStrategy::new(KeySource::secret(SECRET))
}

pub fn identity(sub: &str) -> ResolvedIdentity {
    let claims: IdentityClaims = serde_json::from_value(valid_claims(sub)).unwrap();
    claims::validate(claims).unwrap()
}

/// Provider double that resolves every token to a fixed identity (or none)
/// and counts calls.
#[derive(Clone, Default)]
pub struct StubProvider {
    pub identity: Option<ResolvedIdentity>,
    pub calls: Arc<AtomicUsize>,
    pub last_token: Arc<std::sync::Mutex<Option<String>>>,
}

impl StubProvider {
    pub fn resolving(sub: &str) -> Self {
        Self {
            identity: Some(identity(sub)),
            ..Default::default()
        }
    }

    pub fn rejecting() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_token(&self) -> Option<String> {
        self.last_token.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    async fn user_from_access_token(&self, token: &str) -> Option<ResolvedIdentity> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock().unwrap() = Some(token.to_string());
        self.identity.clone()
    }
}
