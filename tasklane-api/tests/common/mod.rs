//! Common test utilities for integration tests
//!
//! Every test gets its own router over a fresh in-memory store, so tests
//! need no database and never see each other's data.
//!
//! - Seeded user `user@example.com` / `secret123`
//! - Token helpers for extra users and for expired tokens
//! - Request helpers that decode JSON bodies

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::response::Response;
use chrono::Duration;
use serde_json::Value;
use tasklane_api::app::{build_router, AppState};
use tasklane_api::config::Config;
use tasklane_shared::auth::jwt::{Identity, TokenKind};
use tasklane_shared::auth::password::{hash_password_with, HashCost};
use tasklane_shared::models::user::{CreateUser, User};
use tasklane_shared::store::{MemoryStore, Store};
use tower::ServiceExt;

pub const SEED_EMAIL: &str = "user@example.com";
pub const SEED_PASSWORD: &str = "secret123";

/// Test context containing all necessary resources
pub struct TestContext {
    pub state: AppState,
    pub app: axum::Router,
    pub user: User,
    pub token: String,
}

/// A decoded response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// All `Set-Cookie` values
    pub fn cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect()
    }
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "JWT_ACCESS_SECRET" => Some("test-access-secret-that-is-long-enough".to_string()),
        "JWT_REFRESH_SECRET" => Some("test-refresh-secret-that-is-long-enough".to_string()),
        _ => None,
    })
    .expect("test configuration is valid")
}

async fn seed_user(state: &AppState, email: &str, password: &str) -> User {
    state
        .store()
        .create_user(CreateUser {
            email: email.to_string(),
            password_hash: hash_password_with(password, HashCost::MINIMAL).unwrap(),
            name: Some(email.split('@').next().unwrap_or("user").to_string()),
        })
        .await
        .unwrap()
}

fn access_token(state: &AppState, user: &User, ttl: Duration) -> String {
    let identity = Identity {
        user_id: user.id,
        email: user.email.clone(),
    };
    state.tokens.issue(&identity, TokenKind::Access, ttl).unwrap()
}

impl TestContext {
    pub async fn new() -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let state = AppState::new(store, test_config());
        let app = build_router(state.clone());

        let user = seed_user(&state, SEED_EMAIL, SEED_PASSWORD).await;
        let token = access_token(&state, &user, Duration::minutes(15));

        TestContext {
            state,
            app,
            user,
            token,
        }
    }

    /// Creates a user directly in the store and returns an access token
    pub async fn create_user(&self, email: &str, password: &str) -> (User, String) {
        let user = seed_user(&self.state, email, password).await;
        let token = self.token_for(&user, Duration::minutes(15));
        (user, token)
    }

    /// An access token for `user` expiring `ttl` from now
    pub fn token_for(&self, user: &User, ttl: Duration) -> String {
        access_token(&self.state, user, ttl)
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response: Response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Sends a request with an optional bearer token and JSON body
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    /// Request as the seeded user
    pub async fn as_user(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        self.request(method, uri, Some(&self.token), body).await
    }
}
