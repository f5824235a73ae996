#![allow(clippy::needless_for_each)]

use crate::remember::{Authenticator, CookieOptions, HttpCookies};
use anyhow::Result;
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    routing::{get, post},
    Router,
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;

pub mod handlers;
pub mod sweep;

use handlers::{
    health, health::__path_health, remember, remember::__path_issue, remember::__path_login,
    remember::__path_logout, remember::__path_session,
};

#[derive(OpenApi)]
#[openapi(
    paths(health, issue, login, session, logout),
    components(schemas(
        health::Health,
        remember::IssueRequest,
        remember::IdentityResponse,
        remember::SessionResponse,
        remember::ErrorResponse
    )),
    tags(
        (name = "rememberme", description = "Persistent login triplets")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Shared request state.
pub struct ApiState {
    authenticator: Authenticator,
    cookie_options: CookieOptions,
    issuer_token: Option<SecretString>,
    pool: Option<PgPool>,
}

impl ApiState {
    #[must_use]
    pub fn new(authenticator: Authenticator, cookie_options: CookieOptions) -> Self {
        Self {
            authenticator,
            cookie_options,
            issuer_token: None,
            pool: None,
        }
    }

    /// Bearer token required by the issue endpoint. Issuing is disabled
    /// without one.
    #[must_use]
    pub fn with_issuer_token(mut self, token: Option<SecretString>) -> Self {
        self.issuer_token = token.filter(|t| !t.expose_secret().is_empty());
        self
    }

    /// Database probed by `/health`.
    #[must_use]
    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    #[must_use]
    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub(crate) fn issuer_token(&self) -> Option<&SecretString> {
        self.issuer_token.as_ref()
    }

    pub(crate) fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    /// Cookie transport for one request.
    pub(crate) fn cookies(&self, headers: &HeaderMap) -> HttpCookies {
        HttpCookies::from_headers(headers, self.cookie_options.clone())
    }
}

/// Build the HTTP router.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/v1/remember", post(remember::issue))
        .route("/v1/remember/login", post(remember::login))
        .route("/v1/remember/session", get(remember::session))
        .route("/v1/remember/logout", post(remember::logout))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &Request<Body>| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state.clone())),
        )
        .route("/health", get(health).options(health))
        .layer(Extension(state))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, state: Arc<ApiState>, sweep_interval: Option<Duration>) -> Result<()> {
    if let Some(every) = sweep_interval {
        sweep::spawn(state.clone(), every);
    }

    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
