/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register new user
/// - `POST /api/auth/login` - Login and get tokens
/// - `POST /api/auth/refresh` - New access token from a live refresh token
/// - `POST /api/auth/logout` - Revoke the refresh token and clear cookies
/// - `GET  /api/auth/me` - Current user
///
/// Login and register return both tokens in the body and also set them as
/// `httpOnly; SameSite=Lax` cookies, so browser clients never have to store
/// them in script-visible storage.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Extension, Json,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tasklane_shared::{
    auth::{
        credentials::{normalize_email, verify_credentials},
        jwt::{Identity, TokenKind},
        middleware::{read_cookie, AuthContext, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
        password::{hash_password, validate_password_strength},
        session::SessionLedger,
    },
    models::user::{CreateUser, User},
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::ApiJson,
};

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (will be validated for strength)
    #[validate(length(min = 8, max = 128, message = "Password must be 8 to 128 characters"))]
    pub password: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// The user block of login and register responses
#[derive(Debug, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: AuthUser,
    pub access_token: String,
    pub refresh_token: String,
}

/// `Set-Cookie` value for one auth cookie
fn auth_cookie(name: &str, value: &str, max_age: Duration, secure: bool) -> String {
    let mut parts = vec![
        format!("{}={}", name, value),
        "Path=/".to_string(),
        format!("Max-Age={}", max_age.num_seconds().max(0)),
        "HttpOnly".to_string(),
        "SameSite=Lax".to_string(),
    ];
    if secure {
        parts.push("Secure".to_string());
    }
    parts.join("; ")
}

/// Issues a token pair, records the refresh session and builds the cookies
async fn start_session(state: &AppState, user: &User) -> ApiResult<(AuthResponse, [String; 2])> {
    let identity = Identity {
        user_id: user.id,
        email: user.email.clone(),
    };
    let access_token = state.tokens.issue_access_token(&identity)?;
    let refresh_token = state.tokens.issue_refresh_token(&identity)?;

    SessionLedger::new(state.store())
        .record_session(user.id, &refresh_token, state.tokens.refresh_ttl())
        .await?;

    let secure = state.config.api.production;
    let cookies = [
        auth_cookie(ACCESS_TOKEN_COOKIE, &access_token, state.tokens.access_ttl(), secure),
        auth_cookie(REFRESH_TOKEN_COOKIE, &refresh_token, state.tokens.refresh_ttl(), secure),
    ];

    Ok((
        AuthResponse {
            user: AuthUser::from(user),
            access_token,
            refresh_token,
        },
        cookies,
    ))
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "SecureP@ss123",
///   "name": "Jane Doe"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Email already registered
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    validate_password_strength(&req.password).map_err(|message| ApiError::Validation {
        message: message.clone(),
        fields: vec![ValidationErrorDetail {
            field: "password".to_string(),
            message,
        }],
    })?;

    let password_hash = hash_password(&req.password)?;
    let user = state
        .store()
        .create_user(CreateUser {
            email: normalize_email(&req.email),
            password_hash,
            name: req.name.filter(|name| !name.trim().is_empty()),
        })
        .await?;

    info!(user_id = %user.id, "User registered");

    let (body, [access, refresh]) = start_session(&state, &user).await?;
    Ok((
        StatusCode::CREATED,
        AppendHeaders([(header::SET_COOKIE, access), (header::SET_COOKIE, refresh)]),
        Json(body),
    ))
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/login
/// Content-Type: application/json
///
/// { "email": "user@example.com", "password": "SecureP@ss123" }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "user": { "id": "uuid", "email": "user@example.com", "name": "Jane Doe" },
///   "accessToken": "eyJ...",
///   "refreshToken": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body or email
/// - `401 Unauthorized`: `{"error": "Invalid credentials"}` for an unknown
///   email and a wrong password alike
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let user = verify_credentials(state.store(), &req.email, &req.password).await?;
    state.store().record_login(user.id).await?;

    info!(user_id = %user.id, "User logged in");

    let (body, [access, refresh]) = start_session(&state, &user).await?;
    Ok((
        AppendHeaders([(header::SET_COOKIE, access), (header::SET_COOKIE, refresh)]),
        Json(body),
    ))
}

fn presented_refresh_token(headers: &HeaderMap, body: Option<ApiJson<RefreshRequest>>) -> Option<String> {
    body.and_then(|ApiJson(req)| req.refresh_token)
        .filter(|token| !token.trim().is_empty())
        .or_else(|| read_cookie(headers, REFRESH_TOKEN_COOKIE))
}

/// Refresh endpoint
///
/// Takes the refresh token from the body (`refreshToken`) or the
/// `refresh_token` cookie. The token must verify and still have a live
/// session row; logout or expiry ends it.
///
/// # Response
///
/// ```json
/// { "accessToken": "eyJ..." }
/// ```
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<ApiJson<RefreshRequest>>,
) -> ApiResult<impl IntoResponse> {
    let token = presented_refresh_token(&headers, body)
        .ok_or_else(|| ApiError::Unauthorized("Refresh token required".to_string()))?;

    let identity = state.tokens.verify(&token, TokenKind::Refresh)?;

    if !SessionLedger::new(state.store()).is_active(&token).await? {
        tracing::debug!(user_id = %identity.user_id, "Refresh with revoked or expired session");
        return Err(ApiError::Unauthorized("Session expired or revoked".to_string()));
    }

    let access_token = state.tokens.issue_access_token(&identity)?;
    let cookie = auth_cookie(
        ACCESS_TOKEN_COOKIE,
        &access_token,
        state.tokens.access_ttl(),
        state.config.api.production,
    );

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({ "accessToken": access_token })),
    ))
}

/// Logout endpoint
///
/// Revoking an unknown or already revoked token still succeeds.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<ApiJson<RefreshRequest>>,
) -> ApiResult<impl IntoResponse> {
    if let Some(token) = presented_refresh_token(&headers, body) {
        SessionLedger::new(state.store()).revoke(&token).await?;
    }

    let secure = state.config.api.production;
    let cleared = [
        auth_cookie(ACCESS_TOKEN_COOKIE, "", Duration::zero(), secure),
        auth_cookie(REFRESH_TOKEN_COOKIE, "", Duration::zero(), secure),
    ];

    Ok((
        AppendHeaders(cleared.map(|cookie| (header::SET_COOKIE, cookie))),
        Json(json!({ "success": true })),
    ))
}

/// Current user endpoint
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<serde_json::Value>> {
    let user = state
        .store()
        .find_user_by_id(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({ "user": user })))
}
