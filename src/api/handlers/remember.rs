//! Remember-me endpoints: issue, login (rotate), session check, logout.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::ToSchema;

use super::extract_bearer_token;
use crate::api::ApiState;
use crate::remember::{token::hash_token, triplet::valid_identity, LoginOutcome};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct IssueRequest {
    pub identity: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct IdentityResponse {
    pub identity: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub valid: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/v1/remember",
    request_body = IssueRequest,
    responses(
        (status = 201, description = "Remember-me cookie issued", body = IdentityResponse),
        (status = 400, description = "Missing payload or unusable identity", body = ErrorResponse),
        (status = 401, description = "Missing or wrong issuer token", body = ErrorResponse),
        (status = 403, description = "Issuing is disabled", body = ErrorResponse)
    ),
    tag = "rememberme"
)]
/// Start a remember-me chain for an identity the caller has already verified.
pub async fn issue(
    headers: HeaderMap,
    state: Extension<Arc<ApiState>>,
    payload: Option<Json<IssueRequest>>,
) -> Response {
    let Some(expected) = state.issuer_token() else {
        return error_response(StatusCode::FORBIDDEN, "Issuing is disabled");
    };
    let authorized = extract_bearer_token(&headers)
        .is_some_and(|token| hash_token(&token) == hash_token(expected.expose_secret()));
    if !authorized {
        warn!("Rejected issue request with bad issuer token");
        return error_response(StatusCode::UNAUTHORIZED, "Invalid issuer token");
    }

    let request: IssueRequest = match payload {
        Some(Json(payload)) => payload,
        None => return error_response(StatusCode::BAD_REQUEST, "Missing payload"),
    };
    if !valid_identity(&request.identity) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid identity");
    }

    let mut cookies = state.cookies(&headers);
    match state
        .authenticator()
        .create_cookie(&request.identity, &mut cookies)
        .await
    {
        Ok(()) => (
            StatusCode::CREATED,
            cookies.into_headers(),
            Json(IdentityResponse {
                identity: request.identity,
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to issue remember-me cookie: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/remember/login",
    responses(
        (status = 200, description = "Authenticated; cookie rotated", body = IdentityResponse),
        (status = 204, description = "No usable remember-me cookie"),
        (status = 401, description = "Replayed token; cookie cleared", body = ErrorResponse)
    ),
    tag = "rememberme"
)]
/// Log in from the remember-me cookie and rotate it.
pub async fn login(headers: HeaderMap, state: Extension<Arc<ApiState>>) -> Response {
    let mut cookies = state.cookies(&headers);
    match state.authenticator().login(&mut cookies).await {
        Ok(LoginOutcome::Authenticated(identity)) => (
            StatusCode::OK,
            cookies.into_headers(),
            Json(IdentityResponse { identity }),
        )
            .into_response(),
        Ok(LoginOutcome::Invalid) => (
            StatusCode::UNAUTHORIZED,
            cookies.into_headers(),
            Json(ErrorResponse {
                error: "Remember-me token was already used".to_string(),
            }),
        )
            .into_response(),
        Ok(LoginOutcome::NotAuthenticated) => {
            (StatusCode::NO_CONTENT, cookies.into_headers()).into_response()
        }
        Err(err) => {
            error!("Failed to process remember-me login: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/remember/session",
    responses(
        (status = 200, description = "Whether the cookie is currently valid", body = SessionResponse)
    ),
    tag = "rememberme"
)]
/// Check the remember-me cookie without consuming it.
pub async fn session(headers: HeaderMap, state: Extension<Arc<ApiState>>) -> Response {
    let cookies = state.cookies(&headers);
    match state.authenticator().cookie_is_valid(&cookies).await {
        Ok(valid) => (StatusCode::OK, Json(SessionResponse { valid })).into_response(),
        Err(err) => {
            error!("Failed to check remember-me cookie: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/remember/logout",
    responses(
        (status = 204, description = "Cookie cleared")
    ),
    tag = "rememberme"
)]
/// Clear the remember-me cookie and delete its chain.
pub async fn logout(headers: HeaderMap, state: Extension<Arc<ApiState>>) -> Response {
    let mut cookies = state.cookies(&headers);
    match state.authenticator().clear_cookie(&mut cookies).await {
        Ok(_) => (StatusCode::NO_CONTENT, cookies.into_headers()).into_response(),
        Err(err) => {
            error!("Failed to clear remember-me cookie: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::api::{router, ApiState};
    use crate::remember::{
        Authenticator, AuthenticatorConfig, CookieOptions, MemoryTripletStore, OsRngTokenSource,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE},
            Request, StatusCode,
        },
        Router,
    };
    use secrecy::SecretString;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    const ISSUER: &str = "issuer-secret";

    fn app() -> (Router, Arc<MemoryTripletStore>) {
        let store = Arc::new(MemoryTripletStore::new());
        let authenticator = Authenticator::new(
            AuthenticatorConfig::new(),
            store.clone(),
            Arc::new(OsRngTokenSource),
        );
        let state = ApiState::new(authenticator, CookieOptions::new())
            .with_issuer_token(Some(SecretString::from(ISSUER.to_string())));
        (router(Arc::new(state)), store)
    }

    /// `name=value` of the first `Set-Cookie` on a response.
    fn cookie_pair(response: &axum::response::Response) -> String {
        let header = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        header.split(';').next().unwrap().to_string()
    }

    async fn json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn issue(app: &Router, identity: &str) -> axum::response::Response {
        app.clone()
            .oneshot(
                Request::post("/v1/remember")
                    .header(AUTHORIZATION, format!("Bearer {ISSUER}"))
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(format!(r#"{{"identity":"{identity}"}}"#)))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn post_with_cookie(app: &Router, path: &str, cookie: &str) -> axum::response::Response {
        app.clone()
            .oneshot(
                Request::post(path)
                    .header(COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn issue_requires_issuer_token() {
        let (app, store) = app();
        let response = app
            .oneshot(
                Request::post("/v1/remember")
                    .header(AUTHORIZATION, "Bearer wrong")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"identity":"u1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn issue_disabled_without_issuer_token() {
        let store = Arc::new(MemoryTripletStore::new());
        let authenticator = Authenticator::new(
            AuthenticatorConfig::new(),
            store.clone(),
            Arc::new(OsRngTokenSource),
        );
        let app = router(Arc::new(ApiState::new(authenticator, CookieOptions::new())));
        let response = issue(&app, "u1").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn issue_rejects_identity_with_delimiter() {
        let (app, store) = app();
        let response = issue(&app, "a|b").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn issue_rejects_identity_that_cannot_be_a_cookie() {
        let (app, store) = app();
        for identity in ["Alice Smith", "jos\u{e9}", "a,b"] {
            let response = issue(&app, identity).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(response.headers().get(SET_COOKIE).is_none());
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn login_rotates_and_replay_is_rejected() {
        let (app, store) = app();

        let issued = issue(&app, "u1").await;
        assert_eq!(issued.status(), StatusCode::CREATED);
        let original = cookie_pair(&issued);
        assert_eq!(json(issued).await["identity"], "u1");

        let login = post_with_cookie(&app, "/v1/remember/login", &original).await;
        assert_eq!(login.status(), StatusCode::OK);
        let rotated = cookie_pair(&login);
        assert_ne!(rotated, original);
        assert_eq!(json(login).await["identity"], "u1");

        let replay = post_with_cookie(&app, "/v1/remember/login", &original).await;
        assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(cookie_pair(&replay), "REMEMBERME=");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn login_without_cookie_is_no_content() {
        let (app, _store) = app();
        let response = app
            .oneshot(
                Request::post("/v1/remember/login")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn session_does_not_rotate() {
        let (app, store) = app();
        let issued = issue(&app, "u1").await;
        let cookie = cookie_pair(&issued);
        let before = store.snapshot().await;

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(
                    Request::get("/v1/remember/session")
                        .header(COOKIE, &cookie)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().get(SET_COOKIE).is_none());
            assert_eq!(json(response).await["valid"], true);
        }

        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn logout_clears_cookie_and_chain() {
        let (app, store) = app();
        let first = cookie_pair(&issue(&app, "u1").await);
        let _second = issue(&app, "u1").await;
        assert_eq!(store.len().await, 2);

        let response = post_with_cookie(&app, "/v1/remember/logout", &first).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(cookie_pair(&response), "REMEMBERME=");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn health_without_database() {
        let (app, _store) = app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("X-App").is_some());
        let body = json(response).await;
        assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
        assert_eq!(body["database"], "none");
    }
}
