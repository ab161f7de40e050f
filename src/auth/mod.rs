// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Supabase authentication for the MineComply API.
//!
//! ## Auth Flow
//!
//! 1. Client authenticates with Supabase and sends `Authorization: Bearer <access token>`
//! 2. `capture_credential` copies the token into the request's [`CredentialRelay`]
//! 3. [`AuthGuard`]:
//!    - skips routes marked in [`PublicRoutes`]
//!    - verifies the JWT locally (shared secret or JWKS): signature, expiry,
//!      optional audience/issuer
//!    - on failure, consumes the relay and asks Supabase Auth for the user
//!    - attaches the [`ResolvedIdentity`] to the request, or rejects with `401`
//!
//! ## Security
//!
//! - Every route is guarded unless explicitly marked public
//! - Rejections never reveal which verification path failed
//! - JWKS is cached with TTL and single-flight refresh
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod guard;
pub mod jwks;
pub mod provider;
pub mod relay;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use claims::{validate, IdentityClaims, ResolvedIdentity};
pub use error::AuthError;
pub use extractor::CurrentUser;
pub use guard::{install, AuthGuard, GuardDecision, PublicRoutes};
pub use jwks::JwksManager;
pub use provider::{IdentityProvider, SupabaseAuthClient};
pub use relay::CredentialRelay;
pub use strategy::{JwtStrategy, KeySource, StatelessVerifier};
