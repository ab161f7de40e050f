// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote identity verification against Supabase Auth.
//!
//! Used by the guard when stateless verification fails. The provider is asked
//! for the user owning the access token (`GET /auth/v1/user`), authenticated
//! with the project's service-role key.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::claims::{self, Audience, IdentityClaims, Metadata, ResolvedIdentity};
use super::AuthError;

/// Default bound on a provider lookup.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Capability: resolve a raw access token through the identity provider.
///
/// Returns `None` when the provider does not vouch for the token, including
/// on transport faults. Implementations never return an error.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn user_from_access_token(&self, token: &str) -> Option<ResolvedIdentity>;
}

/// User object returned by Supabase Auth.
#[derive(Debug, Deserialize)]
struct ProviderUser {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    aud: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    app_metadata: Option<Metadata>,
    #[serde(default)]
    user_metadata: Option<Metadata>,
}

impl From<ProviderUser> for IdentityClaims {
    fn from(user: ProviderUser) -> Self {
        IdentityClaims {
            sub: user.id,
            aud: user.aud.map(Audience::One),
            email: user.email,
            role: user.role,
            app_metadata: user.app_metadata,
            user_metadata: user.user_metadata,
            ..Default::default()
        }
    }
}

/// Supabase Auth client for the fallback path.
#[derive(Clone)]
pub struct SupabaseAuthClient {
    user_url: String,
    service_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl SupabaseAuthClient {
    /// # Arguments
    /// - `supabase_url`: project URL (e.g. `https://<project>.supabase.co`)
    /// - `service_key`: service-role key, sent as `apikey`
    /// - `client`: shared HTTP client
    pub fn new(
        supabase_url: &str,
        service_key: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            user_url: format!("{}/auth/v1/user", supabase_url.trim_end_matches('/')),
            service_key: service_key.into(),
            timeout: DEFAULT_TIMEOUT,
            client,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch and map the user owning `token`.
    async fn fetch_user(&self, token: &str) -> Result<ResolvedIdentity, AuthError> {
        let response = self
            .client
            .get(&self.user_url)
            .header("apikey", &self.service_key)
            .bearer_auth(token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnreachable(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(AuthError::ProviderRejected);
        }
        if !status.is_success() {
            return Err(AuthError::ProviderUnreachable(format!(
                "HTTP {status} from user endpoint"
            )));
        }

        let user: ProviderUser = response
            .json()
            .await
            .map_err(|e| AuthError::ProviderUnreachable(e.to_string()))?;

        if user.id.is_none() {
            return Err(AuthError::ProviderRejected);
        }

        claims::validate(user.into())
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuthClient {
    async fn user_from_access_token(&self, token: &str) -> Option<ResolvedIdentity> {
        match self.fetch_user(token).await {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::debug!(error_code = e.error_code(), error = %e, "Supabase getUser failed");
                None
            }
        }
    }
}
