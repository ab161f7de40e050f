// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization guard.
//!
//! Runs on every request:
//!
//! 1. Public route → accept without authentication
//! 2. Stateless JWT verification → accept on success
//! 3. Otherwise consume the request's credential relay and ask the identity
//!    provider → accept if it vouches for the token
//! 4. Otherwise reject with a uniform `401`
//!
//! On accept the [`ResolvedIdentity`] is inserted into the request extensions
//! for handlers (see [`CurrentUser`](super::CurrentUser)).

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};

use super::relay::{capture_credential, presented_credential, CredentialRelay};
use super::{AuthError, IdentityProvider, ResolvedIdentity, StatelessVerifier};

/// Routes and route groups that skip authentication.
///
/// A route matches one exact path; a group matches a path prefix on segment
/// boundaries (`/docs` matches `/docs` and `/docs/index.html`, not
/// `/docsearch`). Trailing slashes are ignored.
#[derive(Debug, Clone, Default)]
pub struct PublicRoutes {
    routes: Vec<String>,
    groups: Vec<String>,
}

fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

impl PublicRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a single route public.
    pub fn route(mut self, path: impl AsRef<str>) -> Self {
        self.routes.push(normalize(path.as_ref()).to_string());
        self
    }

    /// Mark every route under `prefix` public.
    pub fn group(mut self, prefix: impl AsRef<str>) -> Self {
        self.groups.push(normalize(prefix.as_ref()).to_string());
        self
    }

    pub fn is_public(&self, path: &str) -> bool {
        let path = normalize(path);

        self.routes.iter().any(|route| route == path)
            || self.groups.iter().any(|group| {
                path.strip_prefix(group.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || group == "/")
            })
    }
}

/// Outcome of the stateless check, folded into one type whether the verifier
/// returned an error or could not run at all.
#[derive(Debug)]
pub enum Verification {
    Accepted(ResolvedIdentity),
    Rejected(AuthError),
}

/// Terminal state of the guard for one request.
#[derive(Debug)]
pub enum GuardDecision {
    PublicSkip,
    StatelessOk(ResolvedIdentity),
    FallbackOk(ResolvedIdentity),
    Rejected(AuthError),
}

impl GuardDecision {
    pub fn label(&self) -> &'static str {
        match self {
            GuardDecision::PublicSkip => "public_skip",
            GuardDecision::StatelessOk(_) => "stateless_ok",
            GuardDecision::FallbackOk(_) => "fallback_ok",
            GuardDecision::Rejected(_) => "rejected",
        }
    }
}

/// The guard: a stateless verifier with a provider fallback.
pub struct AuthGuard {
    public: PublicRoutes,
    stateless: Arc<dyn StatelessVerifier>,
    fallback: Arc<dyn IdentityProvider>,
}

impl AuthGuard {
    pub fn new(stateless: Arc<dyn StatelessVerifier>, fallback: Arc<dyn IdentityProvider>) -> Self {
        Self {
            public: PublicRoutes::default(),
            stateless,
            fallback,
        }
    }

    pub fn with_public_routes(mut self, public: PublicRoutes) -> Self {
        self.public = public;
        self
    }

    async fn check_stateless(&self, credential: Result<&str, AuthError>) -> Verification {
        let token = match credential {
            Ok(token) => token,
            Err(cause) => return Verification::Rejected(cause),
        };

        match self.stateless.verify(token).await {
            Ok(identity) => Verification::Accepted(identity),
            Err(cause) => Verification::Rejected(cause),
        }
    }

    /// Decide one request.
    ///
    /// `credential` is the bearer token from the request's own
    /// `Authorization` header, or why there is none (see
    /// [`presented_credential`]); `relay` is the request's credential relay,
    /// consumed on the fallback path.
    pub async fn authorize(
        &self,
        path: &str,
        credential: Result<&str, AuthError>,
        relay: &mut CredentialRelay,
    ) -> GuardDecision {
        if self.public.is_public(path) {
            return GuardDecision::PublicSkip;
        }

        let cause = match self.check_stateless(credential).await {
            Verification::Accepted(identity) => return GuardDecision::StatelessOk(identity),
            Verification::Rejected(cause) => cause,
        };
        tracing::debug!(error_code = cause.error_code(), "Stateless verification failed, trying provider");

        let Some(token) = relay.consume() else {
            return GuardDecision::Rejected(cause);
        };

        match self.fallback.user_from_access_token(&token).await {
            Some(identity) => GuardDecision::FallbackOk(identity),
            None => GuardDecision::Rejected(cause),
        }
    }
}

/// Guard middleware. Expects [`capture_credential`] to run first; use
/// [`install`].
pub async fn authorize_request(
    State(guard): State<Arc<AuthGuard>>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut relay = request
        .extensions_mut()
        .remove::<CredentialRelay>()
        .unwrap_or_default();
    let credential = presented_credential(request.headers()).map(str::to_owned);
    let path = request.uri().path().to_owned();

    let decision = guard
        .authorize(&path, credential.as_deref().map_err(AuthError::clone), &mut relay)
        .await;
    relay.clear();

    tracing::debug!(%path, decision = decision.label(), "Authorization decided");

    match decision {
        GuardDecision::PublicSkip => next.run(request).await,
        GuardDecision::StatelessOk(identity) | GuardDecision::FallbackOk(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        GuardDecision::Rejected(cause) => cause.into_response(),
    }
}

/// Wrap `router` with the credential interceptor and the guard.
///
/// Both layers are installed together so that every guarded route has a
/// populated relay.
pub fn install<S>(router: Router<S>, guard: Arc<AuthGuard>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(middleware::from_fn_with_state(guard, authorize_request))
        .layer(middleware::from_fn(capture_credential))
}
