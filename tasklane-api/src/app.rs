/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasklane_api::{app::{build_router, AppState}, config::Config};
/// use tasklane_shared::store::MemoryStore;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{delete, get, patch, post},
    Router,
};
use tasklane_shared::auth::jwt::TokenService;
use tasklane_shared::auth::middleware::{jwt_auth_middleware, AuthError, TokenSource};
use tasklane_shared::store::Store;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend (Postgres or in-memory)
    pub store: Arc<dyn Store>,

    /// Issues and verifies access and refresh tokens
    pub tokens: Arc<TokenService>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let tokens = TokenService::new(config.jwt.token_config());
        Self {
            store,
            tokens: Arc::new(tokens),
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                              # Store connectivity (public)
/// └── /api/
///     ├── /auth/
///     │   ├── POST /register, /login, /refresh, /logout
///     │   └── GET  /me                     # Bearer
///     ├── /workspaces/                     # Bearer
///     │   ├── GET, POST /
///     │   └── GET, POST /:id/members
///     ├── /projects/                       # Bearer
///     │   ├── GET, POST /
///     │   ├── GET, PUT, DELETE /:id
///     │   └── GET, POST /:id/sections
///     └── /tasks/                          # Bearer or access_token cookie
///         ├── GET, POST /
///         ├── GET, PATCH, DELETE /:id
///         ├── /:id/subtasks, /:id/comments, /:id/attachments
///         └── /:id/tags
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Compression
/// 4. Logging (tower-http TraceLayer)
/// 5. Authentication (per route group)
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .route_layer(from_fn_with_state(state.clone(), require_bearer))
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/logout", post(routes::auth::logout));

    let workspace_routes = Router::new()
        .route(
            "/",
            get(routes::workspaces::list_workspaces).post(routes::workspaces::create_workspace),
        )
        .route(
            "/:id/members",
            get(routes::workspaces::list_members).post(routes::workspaces::add_member),
        )
        .route_layer(from_fn_with_state(state.clone(), require_bearer));

    let project_routes = Router::new()
        .route(
            "/",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/:id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/:id/sections",
            get(routes::projects::list_sections).post(routes::projects::create_section),
        )
        .route_layer(from_fn_with_state(state.clone(), require_bearer));

    let task_routes = Router::new()
        .route("/", get(routes::tasks::list_tasks).post(routes::tasks::create_task))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route(
            "/:id/subtasks",
            get(routes::task_items::list_subtasks).post(routes::task_items::create_subtask),
        )
        .route(
            "/:id/subtasks/:subtask_id",
            patch(routes::task_items::update_subtask).delete(routes::task_items::delete_subtask),
        )
        .route(
            "/:id/comments",
            get(routes::task_items::list_comments).post(routes::task_items::add_comment),
        )
        .route(
            "/:id/attachments",
            get(routes::task_items::list_attachments).post(routes::task_items::add_attachment),
        )
        .route(
            "/:id/attachments/:attachment_id",
            delete(routes::task_items::delete_attachment),
        )
        .route("/:id/tags", post(routes::task_items::add_tag))
        .route("/:id/tags/:tag_id", delete(routes::task_items::remove_tag))
        .route_layer(from_fn_with_state(state.clone(), require_bearer_or_cookie));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/workspaces", workspace_routes)
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes);

    let cors = cors_layer(&state.config.api.cors_origins);

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Bearer-only authentication for the management routes
async fn require_bearer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    jwt_auth_middleware(state.tokens.clone(), TokenSource::Bearer, req, next).await
}

/// Task routes also accept the `access_token` cookie set at login
async fn require_bearer_or_cookie(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    jwt_auth_middleware(state.tokens.clone(), TokenSource::BearerOrCookie, req, next).await
}
