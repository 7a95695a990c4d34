/// Request authentication for axum
///
/// Verifies the access token on an inbound request and inserts an
/// [`AuthContext`] into the request extensions. Handlers receive the
/// principal explicitly via `Extension<AuthContext>`; nothing downstream
/// reads tokens or headers again.
///
/// Tokens are taken from `Authorization: Bearer <token>`. Routes mounted
/// with [`TokenSource::BearerOrCookie`] also accept the `access_token`
/// cookie when no header is present.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{extract::Request, middleware::{self, Next}, routing::get, Extension, Router};
/// use tasklane_shared::auth::jwt::{TokenConfig, TokenService};
/// use tasklane_shared::auth::middleware::{jwt_auth_middleware, AuthContext, TokenSource};
///
/// async fn me(Extension(auth): Extension<AuthContext>) -> String {
///     auth.email
/// }
///
/// let tokens = Arc::new(TokenService::new(TokenConfig::new("a".repeat(32), "b".repeat(32))));
/// let app: Router = Router::new()
///     .route("/me", get(me))
///     .layer(middleware::from_fn(move |req: Request, next: Next| {
///         jwt_auth_middleware(tokens.clone(), TokenSource::Bearer, req, next)
///     }));
/// ```

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{Identity, TokenError, TokenKind, TokenService};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// The authenticated principal for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
}

impl From<Identity> for AuthContext {
    fn from(identity: Identity) -> Self {
        AuthContext {
            user_id: identity.user_id,
            email: identity.email,
        }
    }
}

/// Where a route accepts its access token from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Bearer,
    BearerOrCookie,
}

#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,
    InvalidFormat,
    InvalidToken,
    TokenExpired,
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (message, code) = match self {
            AuthError::MissingCredentials => ("Authentication required", "UNAUTHORIZED"),
            AuthError::InvalidFormat => ("Expected a Bearer token", "UNAUTHORIZED"),
            AuthError::InvalidToken => ("Invalid token", "UNAUTHORIZED"),
            AuthError::TokenExpired => ("Token expired", "TOKEN_EXPIRED"),
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": message, "code": code })),
        )
            .into_response()
    }
}

/// Value of cookie `name` from the `Cookie` header(s)
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Pulls the raw access token out of a request's headers
pub fn extract_token(headers: &HeaderMap, source: TokenSource) -> Result<String, AuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value.to_str().map_err(|_| AuthError::InvalidFormat)?;
        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidFormat)?;
        return Ok(token.to_string());
    }

    match source {
        TokenSource::BearerOrCookie => {
            read_cookie(headers, ACCESS_TOKEN_COOKIE).ok_or(AuthError::MissingCredentials)
        }
        TokenSource::Bearer => Err(AuthError::MissingCredentials),
    }
}

/// Verifies the request's access token and returns the principal
pub fn authenticate(
    tokens: &TokenService,
    headers: &HeaderMap,
    source: TokenSource,
) -> Result<AuthContext, AuthError> {
    let token = extract_token(headers, source)?;
    let identity = tokens.verify(&token, TokenKind::Access)?;
    Ok(AuthContext::from(identity))
}

/// axum middleware: rejects with 401 or inserts [`AuthContext`]
pub async fn jwt_auth_middleware(
    tokens: Arc<TokenService>,
    source: TokenSource,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth = authenticate(&tokens, req.headers(), source).map_err(|e| {
        tracing::debug!(error = ?e, path = %req.uri().path(), "Rejected unauthenticated request");
        e
    })?;

    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}
