// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::{http::HeaderValue, routing::get, Router};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::{
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
        server::Server,
    },
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{self, AuthGuard, PublicRoutes, ResolvedIdentity},
    error::route_not_found,
    models::{ApiMetadata, CurrentUserResponse, InternalUser},
    state::AppState,
};

pub mod debug;
pub mod health;
pub mod meta;
pub mod users;

const DOCS_PATH: &str = "/docs";
const OPENAPI_PATH: &str = "/api-doc/openapi.json";

pub fn router(state: AppState) -> Router {
    let prefix = state.config.route_prefix();

    let api_routes = Router::new()
        .route("/", get(meta::api_metadata))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/users/me", get(users::get_current_user))
        .route("/auth-debug/me", get(debug::whoami))
        .route("/auth-debug/headers", get(debug::headers))
        .with_state(state.clone());

    let app = if prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(&prefix, api_routes)
    };
    let app = app
        .merge(SwaggerUi::new(DOCS_PATH).url(OPENAPI_PATH, openapi(&prefix)))
        .fallback(route_not_found);

    let guard = AuthGuard::new(state.strategy.clone(), state.provider.clone())
        .with_public_routes(public_routes(&prefix));

    auth::install(app, Arc::new(guard))
        .layer(cors_layer(&state.config.cors_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Routes reachable without a credential. Everything else is guarded.
fn public_routes(prefix: &str) -> PublicRoutes {
    PublicRoutes::new()
        .route(format!("{prefix}/"))
        .route(format!("{prefix}/health"))
        .route(format!("{prefix}/health/live"))
        .route(format!("{prefix}/health/ready"))
        .route(format!("{prefix}/auth-debug/headers"))
        .group(DOCS_PATH)
        .group("/api-doc")
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

fn openapi(prefix: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    let base = if prefix.is_empty() { "/" } else { prefix };
    doc.servers = Some(vec![Server::new(base)]);
    doc
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "MineComply API"),
    paths(
        meta::api_metadata,
        health::health,
        health::liveness,
        health::readiness,
        users::get_current_user,
        debug::whoami,
        debug::headers
    ),
    components(
        schemas(
            ApiMetadata,
            InternalUser,
            CurrentUserResponse,
            ResolvedIdentity,
            health::HealthResponse,
            health::LivenessResponse,
            health::ReadyResponse,
            health::ReadinessChecks,
            debug::DebugMeResponse,
            debug::DebugHeadersResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Meta", description = "Service metadata"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Users", description = "Local user records"),
        (name = "Auth Debug", description = "Authentication diagnostics")
    )
)]
struct ApiDoc;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::testing::{mint, mint_with, secret_strategy, valid_claims, StubProvider, SECRET};
    use crate::config::AppConfig;
    use axum::{
        body::{to_bytes, Body},
        http::{header::AUTHORIZATION, Request, StatusCode},
    };
    use serde_json::Value;
    use std::collections::HashMap;
    use tower::ServiceExt;

    pub(crate) fn config_with(extra: &[(&str, &str)]) -> AppConfig {
        let mut vars: HashMap<String, String> = [
            ("APP_ENV", "test"),
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_SERVICE_ROLE_KEY", "service-key"),
            ("SUPABASE_JWT_SECRET", SECRET),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        AppConfig::from_lookup(|name| vars.get(name).cloned()).unwrap()
    }

    pub(crate) fn test_config() -> AppConfig {
        config_with(&[])
    }

    fn app_with(provider: StubProvider) -> Router {
        router(AppState::new(test_config(), secret_strategy(), Arc::new(provider)))
    }

    async fn send(app: Router, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().uri(path);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn public_routes_need_no_credential() {
        let app = app_with(StubProvider::rejecting());

        let (status, body) = send(app.clone(), "/api", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "MineComply API");
        assert_eq!(body["environment"], "test");

        for path in ["/api/health", "/api/health/live", "/api/health/ready"] {
            let (status, _) = send(app.clone(), path, None).await;
            assert_eq!(status, StatusCode::OK, "{path}");
        }

        let (status, body) = send(app, OPENAPI_PATH, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["servers"][0]["url"], "/api");
    }

    #[tokio::test]
    async fn protected_route_rejects_missing_credential() {
        let provider = StubProvider::rejecting();
        let (status, body) = send(app_with(provider.clone()), "/api/users/me", None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication failed");
        assert_eq!(body["error_code"], "unauthenticated");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn users_me_with_valid_token() {
        let provider = StubProvider::rejecting();
        let token = mint(&valid_claims("user-1"));
        let (status, body) = send(app_with(provider.clone()), "/api/users/me", Some(&token)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["externalId"], "user-1");
        assert_eq!(body["user"]["email"], "user-1@example.com");
        assert_eq!(body["identity"]["id"], "user-1");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn users_me_falls_back_to_provider() {
        let provider = StubProvider::resolving("provider-user");
        let token = mint_with(&valid_claims("forged"), "other-secret");
        let (status, body) = send(app_with(provider.clone()), "/api/users/me", Some(&token)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["externalId"], "provider-user");
        assert_eq!(provider.calls(), 1);
        assert_eq!(provider.last_token().as_deref(), Some(token.as_str()));
    }

    #[tokio::test]
    async fn users_me_rejects_when_both_paths_fail() {
        let provider = StubProvider::rejecting();
        let token = mint_with(&valid_claims("forged"), "other-secret");
        let (status, body) = send(app_with(provider.clone()), "/api/users/me", Some(&token)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication failed");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn debug_headers_is_public() {
        let token = mint(&valid_claims("user-1"));
        let (status, body) = send(
            app_with(StubProvider::rejecting()),
            "/api/auth-debug/headers",
            Some(&token),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payload"]["sub"], "user-1");
    }

    #[tokio::test]
    async fn debug_me_requires_credential() {
        let app = app_with(StubProvider::rejecting());
        let (status, _) = send(app.clone(), "/api/auth-debug/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = mint(&valid_claims("user-1"));
        let (status, body) = send(app, "/api/auth-debug/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], "user-1");
        assert_eq!(body["authorization"], format!("Bearer {token}"));
    }

    #[tokio::test]
    async fn unknown_routes_are_guarded_then_not_found() {
        let app = app_with(StubProvider::rejecting());
        let (status, _) = send(app.clone(), "/api/nope", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = mint(&valid_claims("user-1"));
        let (status, body) = send(app, "/api/nope", Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Cannot GET /api/nope");
    }

    #[tokio::test]
    async fn prefix_outside_public_list_is_guarded() {
        let app = app_with(StubProvider::rejecting());
        let (status, _) = send(app, "/api/healthz", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn empty_prefix_mounts_at_root() {
        let config = config_with(&[("GLOBAL_PREFIX", "/")]);
        let app = router(AppState::new(
            config,
            secret_strategy(),
            Arc::new(StubProvider::rejecting()),
        ));

        let (status, _) = send(app.clone(), "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(app, "/users/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let response = app_with(StubProvider::rejecting())
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn cors_preflight_is_answered_for_allowed_origin() {
        let response = app_with(StubProvider::rejecting())
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/users/me")
                    .header("origin", "http://localhost:3000")
                    .header("access-control-request-method", "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "http://localhost:3000"
        );
    }
}
