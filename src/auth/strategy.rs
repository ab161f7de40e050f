// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stateless JWT verification.
//!
//! Verifies a Supabase access token locally, either against the project's
//! shared JWT secret (HS256) or against keys published at the project's JWKS
//! endpoint. Never calls the identity provider's user endpoint.

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

use super::claims::{self, IdentityClaims, ResolvedIdentity};
use super::{AuthError, JwksManager};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Capability: verify a bearer token without contacting the provider.
#[async_trait]
pub trait StatelessVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<ResolvedIdentity, AuthError>;
}

/// Where signature keys come from.
#[derive(Clone)]
pub enum KeySource {
    /// Static shared secret (HMAC)
    Secret(DecodingKey),
    /// Remote key set, fetched and cached
    Jwks(JwksManager),
}

impl KeySource {
    pub fn secret(secret: &str) -> Self {
        KeySource::Secret(DecodingKey::from_secret(secret.as_bytes()))
    }
}

/// JWT verification strategy.
#[derive(Clone)]
pub struct JwtStrategy {
    keys: KeySource,
    audience: Option<String>,
    issuer: Option<String>,
}

impl JwtStrategy {
    pub fn new(keys: KeySource) -> Self {
        Self {
            keys,
            audience: None,
            issuer: None,
        }
    }

    /// Require this `aud` claim.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Require this `iss` claim.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// The JWKS manager, when keys are fetched remotely.
    pub fn jwks(&self) -> Option<&JwksManager> {
        match &self.keys {
            KeySource::Jwks(jwks) => Some(jwks),
            KeySource::Secret(_) => None,
        }
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_nbf = true;

        if let Some(ref issuer) = self.issuer {
            validation.set_issuer(&[issuer]);
        }

        if let Some(ref audience) = self.audience {
            validation.set_audience(&[audience]);
        } else {
            validation.validate_aud = false;
        }

        validation
    }
}

#[async_trait]
impl StatelessVerifier for JwtStrategy {
    async fn verify(&self, token: &str) -> Result<ResolvedIdentity, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;

        let (decoding_key, algorithm) = match &self.keys {
            KeySource::Secret(key) => {
                let algorithm = match header.alg {
                    Algorithm::HS384 | Algorithm::HS512 => header.alg,
                    _ => Algorithm::HS256,
                };
                (key.clone(), algorithm)
            }
            KeySource::Jwks(jwks) => jwks.decoding_key(header.kid.as_deref()).await?,
        };

        let token_data = decode::<IdentityClaims>(token, &decoding_key, &self.validation(algorithm))
            .map_err(|e| AuthError::from_jwt(&e))?;

        claims::validate(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::{mint, mint_with, now, secret_strategy, valid_claims, SECRET};
    use base64ct::{Base64UrlUnpadded, Encoding};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn accepts_valid_token() {
        let identity = secret_strategy()
            .verify(&mint(&valid_claims("user-123")))
            .await
            .unwrap();
        assert_eq!(identity.id, "user-123");
        assert_eq!(identity.role.as_deref(), Some("authenticated"));
    }

    #[tokio::test]
    async fn rejects_wrong_signature() {
        let token = mint_with(&valid_claims("user-123"), "some-other-secret");
        let result = secret_strategy().verify(&token).await;
        assert_eq!(result, Err(AuthError::InvalidSignature));
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let mut claims = valid_claims("user-123");
        claims["exp"] = json!(now() - 3600);
        let result = secret_strategy().verify(&mint(&claims)).await;
        assert_eq!(result, Err(AuthError::ExpiredToken));
    }

    #[tokio::test]
    async fn tolerates_small_clock_skew() {
        let mut claims = valid_claims("user-123");
        claims["exp"] = json!(now() - 10);
        assert!(secret_strategy().verify(&mint(&claims)).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_token_not_yet_valid() {
        let mut claims = valid_claims("user-123");
        claims["nbf"] = json!(now() + 3600);
        let result = secret_strategy().verify(&mint(&claims)).await;
        assert_eq!(result, Err(AuthError::TokenNotYetValid));
    }

    #[tokio::test]
    async fn rejects_token_without_expiry() {
        let mut claims = valid_claims("user-123");
        claims.as_object_mut().unwrap().remove("exp");
        assert!(secret_strategy().verify(&mint(&claims)).await.is_err());
    }

    #[tokio::test]
    async fn missing_subject_is_an_authentication_failure() {
        let mut claims = valid_claims("user-123");
        claims.as_object_mut().unwrap().remove("sub");
        let result = secret_strategy().verify(&mint(&claims)).await;
        assert!(matches!(result, Err(AuthError::MalformedClaims(_))));
    }

    #[tokio::test]
    async fn enforces_configured_audience() {
        let strategy = secret_strategy().with_audience("authenticated");
        assert!(strategy.verify(&mint(&valid_claims("u1"))).await.is_ok());

        let mut claims = valid_claims("u1");
        claims["aud"] = json!("anon");
        assert_eq!(strategy.verify(&mint(&claims)).await, Err(AuthError::InvalidAudience));
    }

    #[tokio::test]
    async fn enforces_configured_issuer() {
        let strategy = secret_strategy().with_issuer("https://project.supabase.co/auth/v1");
        let mut claims = valid_claims("u1");
        claims["iss"] = json!("https://elsewhere.example.com");
        assert_eq!(strategy.verify(&mint(&claims)).await, Err(AuthError::InvalidIssuer));
    }

    #[tokio::test]
    async fn garbage_is_malformed() {
        assert_eq!(
            secret_strategy().verify("not-a-jwt").await,
            Err(AuthError::MalformedToken)
        );
    }

    #[tokio::test]
    async fn verifies_against_remote_key_set() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keys": [{
                    "kty": "oct",
                    "kid": "supabase-1",
                    "alg": "HS256",
                    "k": Base64UrlUnpadded::encode_string(SECRET.as_bytes()),
                }]
            })))
            .mount(&server)
            .await;

        let jwks = JwksManager::new(format!("{}/jwks", server.uri()), reqwest::Client::new());
        let strategy = JwtStrategy::new(KeySource::Jwks(jwks));
        assert!(strategy.jwks().is_some());

        let mut header = Header::default();
        header.kid = Some("supabase-1".to_string());
        let token = encode(
            &header,
            &valid_claims("user-jwks"),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let identity = strategy.verify(&token).await.unwrap();
        assert_eq!(identity.id, "user-jwks");
    }
}
