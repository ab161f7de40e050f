// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup. Empty values are
//! treated as unset.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3000` |
//! | `GLOBAL_PREFIX` | Path prefix for all API routes | `api` |
//! | `CORS_ORIGINS` | Comma-separated allowed origins | `http://localhost:3000,http://localhost:19006` |
//! | `APP_NAME` | Service name reported by metadata/health | `MineComply API` |
//! | `APP_DESCRIPTION` | Service description | `MineComply compliance management API` |
//! | `APP_ENV` | `development`, `test`, `staging` or `production` | `development` |
//! | `SUPABASE_URL` | Supabase project URL | Required |
//! | `SUPABASE_SERVICE_ROLE_KEY` | Service key for provider user lookups | Required |
//! | `SUPABASE_JWKS_URL` | JWKS endpoint for JWT verification | Required unless `SUPABASE_JWT_SECRET` is set |
//! | `SUPABASE_JWT_SECRET` | Shared HS256 secret (takes precedence over JWKS) | Optional |
//! | `SUPABASE_JWT_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `SUPABASE_JWT_ISSUER` | Expected JWT issuer claim | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const GLOBAL_PREFIX_ENV: &str = "GLOBAL_PREFIX";
pub const CORS_ORIGINS_ENV: &str = "CORS_ORIGINS";
pub const APP_NAME_ENV: &str = "APP_NAME";
pub const APP_DESCRIPTION_ENV: &str = "APP_DESCRIPTION";
pub const APP_ENV_ENV: &str = "APP_ENV";
pub const SUPABASE_URL_ENV: &str = "SUPABASE_URL";
pub const SUPABASE_SERVICE_ROLE_KEY_ENV: &str = "SUPABASE_SERVICE_ROLE_KEY";
pub const SUPABASE_JWKS_URL_ENV: &str = "SUPABASE_JWKS_URL";
pub const SUPABASE_JWT_SECRET_ENV: &str = "SUPABASE_JWT_SECRET";
pub const SUPABASE_JWT_AUDIENCE_ENV: &str = "SUPABASE_JWT_AUDIENCE";
pub const SUPABASE_JWT_ISSUER_ENV: &str = "SUPABASE_JWT_ISSUER";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GLOBAL_PREFIX: &str = "api";
const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:19006"];
const DEFAULT_APP_NAME: &str = "MineComply API";
const DEFAULT_APP_DESCRIPTION: &str = "MineComply compliance management API";

/// Configuration errors. Any of these aborts startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Service identity reported by the metadata and health endpoints.
#[derive(Debug, Clone)]
pub struct AppInfo {
    pub name: String,
    pub description: String,
    pub version: String,
    pub environment: Environment,
}

/// Key material for stateless JWT verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// Shared HS256 secret
    Secret(String),
    /// JWKS endpoint
    Jwks(Url),
}

/// Supabase project settings.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: Url,
    pub service_role_key: String,
    pub key_material: KeyMaterial,
    pub jwt_audience: Option<String>,
    pub jwt_issuer: Option<String>,
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Prefix without slashes; empty means routes are mounted at `/`
    pub global_prefix: String,
    pub cors_origins: Vec<String>,
    pub app: AppInfo,
    pub supabase: SupabaseConfig,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to read variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let url = |name: &'static str| -> Result<Option<Url>, ConfigError> {
            var(name)
                .map(|raw| {
                    Url::parse(&raw).map_err(|e| ConfigError::Invalid {
                        name,
                        reason: e.to_string(),
                    })
                })
                .transpose()
        };

        let port = match var(PORT_ENV) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: PORT_ENV,
                reason: format!("'{raw}' is not a port number"),
            })?,
            None => DEFAULT_PORT,
        };

        let environment = match var(APP_ENV_ENV) {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                name: APP_ENV_ENV,
                reason,
            })?,
            None => Environment::default(),
        };

        let log_format = match var(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let cors_origins = var(CORS_ORIGINS_ENV)
            .map(|raw| parse_cors_origins(&raw))
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect());

        let key_material = match (var(SUPABASE_JWT_SECRET_ENV), url(SUPABASE_JWKS_URL_ENV)?) {
            (Some(secret), _) => KeyMaterial::Secret(secret),
            (None, Some(jwks_url)) => KeyMaterial::Jwks(jwks_url),
            (None, None) => return Err(ConfigError::Missing(SUPABASE_JWKS_URL_ENV)),
        };

        let supabase = SupabaseConfig {
            url: url(SUPABASE_URL_ENV)?.ok_or(ConfigError::Missing(SUPABASE_URL_ENV))?,
            service_role_key: var(SUPABASE_SERVICE_ROLE_KEY_ENV)
                .ok_or(ConfigError::Missing(SUPABASE_SERVICE_ROLE_KEY_ENV))?,
            key_material,
            jwt_audience: var(SUPABASE_JWT_AUDIENCE_ENV),
            jwt_issuer: var(SUPABASE_JWT_ISSUER_ENV),
        };

        Ok(Self {
            host: var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            global_prefix: var(GLOBAL_PREFIX_ENV)
                .unwrap_or_else(|| DEFAULT_GLOBAL_PREFIX.to_string())
                .trim_matches('/')
                .to_string(),
            cors_origins,
            app: AppInfo {
                name: var(APP_NAME_ENV).unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
                description: var(APP_DESCRIPTION_ENV)
                    .unwrap_or_else(|| DEFAULT_APP_DESCRIPTION.to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                environment,
            },
            supabase,
            log_format,
        })
    }

    /// Socket address to bind. `HOST` must be an IPv4 or IPv6 address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|_| ConfigError::Invalid {
            name: HOST_ENV,
            reason: format!("'{}' is not an IP address", self.host),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// `/<prefix>`, or empty when no prefix is configured.
    pub fn route_prefix(&self) -> String {
        if self.global_prefix.is_empty() {
            String::new()
        } else {
            format!("/{}", self.global_prefix)
        }
    }
}

fn parse_cors_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
