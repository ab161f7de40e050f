// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::auth::{IdentityProvider, JwksManager, JwtStrategy, KeySource, SupabaseAuthClient};
use crate::config::{AppConfig, KeyMaterial};
use crate::store::InMemoryStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<RwLock<InMemoryStore>>,
    /// Stateless verification path
    pub strategy: Arc<JwtStrategy>,
    /// Fallback verification path
    pub provider: Arc<dyn IdentityProvider>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        strategy: JwtStrategy,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(RwLock::new(InMemoryStore::new())),
            strategy: Arc::new(strategy),
            provider,
            started_at: Instant::now(),
        }
    }

    /// Wire both verification paths from configuration.
    pub fn from_config(config: AppConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let supabase = &config.supabase;
        let keys = match &supabase.key_material {
            KeyMaterial::Secret(secret) => KeySource::secret(secret),
            KeyMaterial::Jwks(url) => KeySource::Jwks(JwksManager::new(url.as_str(), client.clone())),
        };

        let mut strategy = JwtStrategy::new(keys);
        if let Some(ref audience) = supabase.jwt_audience {
            strategy = strategy.with_audience(audience);
        }
        if let Some(ref issuer) = supabase.jwt_issuer {
            strategy = strategy.with_issuer(issuer);
        }

        let provider =
            SupabaseAuthClient::new(supabase.url.as_str(), &supabase.service_role_key, client);

        Ok(Self::new(config, strategy, Arc::new(provider)))
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
