/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>`; library errors convert into it
/// with `?`.
///
/// Every error body has the same shape:
///
/// ```json
/// { "error": "Project not found or access denied", "code": "NOT_FOUND" }
/// ```
///
/// with an optional `details` member for conflicts and validation failures.
///
/// # Example
///
/// ```
/// use tasklane_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(name: Option<String>) -> ApiResult<Json<Value>> {
///     let name = name.ok_or_else(|| ApiError::validation("Name is required"))?;
///     Ok(Json(json!({ "name": name })))
/// }
/// ```

use std::fmt;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tasklane_shared::access::guard::{Action, Denial, DenialKind};
use tasklane_shared::access::membership::EntityRef;
use tasklane_shared::auth::credentials::CredentialError;
use tasklane_shared::auth::jwt::TokenError;
use tasklane_shared::auth::middleware::AuthError;
use tasklane_shared::auth::password::PasswordError;
use tasklane_shared::error::ServiceError;
use tasklane_shared::services::projects::has_tasks_details;
use tasklane_shared::store::{constraints, StoreError};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request: unparseable body, bad path or query (400)
    BadRequest(String),

    /// Missing required fields or invalid values (400)
    Validation {
        message: String,
        fields: Vec<ValidationErrorDetail>,
    },

    /// Unauthenticated (401)
    Unauthorized(String),

    /// Access token expired; the client should refresh and retry (401)
    TokenExpired,

    /// Authenticated but not allowed (403)
    Forbidden(String),

    /// Not found, or hidden from this caller (404)
    NotFound(String),

    /// Duplicate or blocked by existing children (409)
    Conflict {
        message: String,
        details: Option<String>,
    },

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,

    /// Machine-readable error code
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) | ApiError::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::TokenExpired => "TOKEN_EXPIRED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict { .. } => "CONFLICT",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Validation { message, .. } => write!(f, "Validation failed: {}", message),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::TokenExpired => write!(f, "Unauthorized: Token expired"),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code().to_string();

        let (error, details) = match self {
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                ("An internal error occurred".to_string(), None)
            }
            ApiError::TokenExpired => ("Token expired".to_string(), None),
            ApiError::Validation { message, fields } => {
                let details = (!fields.is_empty())
                    .then(|| serde_json::to_value(&fields).unwrap_or(Value::Null));
                (message, details)
            }
            ApiError::Conflict { message, details } => (message, details.map(Value::String)),
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::ServiceUnavailable(msg) => (msg, None),
        };

        (status, Json(ErrorResponse { error, code, details })).into_response()
    }
}

/// What a caller is told when an entity is missing or hidden from them
fn not_found_message(entity: EntityRef) -> &'static str {
    match entity {
        EntityRef::Workspace(_) => "Workspace not found",
        EntityRef::Project(_) => "Project not found or access denied",
        EntityRef::Section(_) => "Section not found",
        EntityRef::Task(_) => "Task not found",
    }
}

fn forbidden_message(action: Action, denial: Denial) -> &'static str {
    match (action, denial) {
        (_, Denial::NotMember) => "You do not have access to this workspace",
        (Action::CreateProject, _) => "You do not have permission to create projects",
        (Action::ManageMembers, _) => "Only workspace admins can manage members",
        _ => "You do not have permission to perform this action",
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Denied {
                action,
                entity,
                denial,
            } => match denial.kind(action) {
                DenialKind::NotFound => ApiError::NotFound(not_found_message(entity).to_string()),
                DenialKind::Forbidden => {
                    ApiError::Forbidden(forbidden_message(action, denial).to_string())
                }
                DenialKind::Conflict => {
                    let tasks = match denial {
                        Denial::HasTasks(n) => n,
                        _ => 0,
                    };
                    ApiError::Conflict {
                        message: "Cannot delete project with existing tasks".to_string(),
                        details: Some(has_tasks_details(tasks)),
                    }
                }
            },
            ServiceError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            ServiceError::Validation(message) => ApiError::validation(message),
            ServiceError::Conflict { message, details } => ApiError::Conflict { message, details },
            ServiceError::Store(e) => e.into(),
        }
    }
}

/// Convert storage errors to API errors
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(constraint) if constraint == constraints::USER_EMAIL => {
                ApiError::Conflict {
                    message: "Email already registered".to_string(),
                    details: None,
                }
            }
            StoreError::Conflict(constraint) => ApiError::Conflict {
                message: "Resource already exists".to_string(),
                details: Some(format!("Constraint violation: {}", constraint)),
            },
            StoreError::InvalidReference(_) => {
                ApiError::BadRequest("Referenced record does not exist".to_string())
            }
            StoreError::Database(e) => ApiError::InternalError(format!("Database error: {}", e)),
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid credentials".to_string())
            }
            CredentialError::Password(e) => e.into(),
            CredentialError::Store(e) => e.into(),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => ApiError::TokenExpired,
            TokenError::Invalid(_) => ApiError::Unauthorized("Invalid token".to_string()),
            TokenError::Signing(msg) => ApiError::InternalError(format!("Token signing failed: {}", msg)),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Authentication required".to_string())
            }
            AuthError::InvalidFormat => ApiError::Unauthorized("Expected a Bearer token".to_string()),
            AuthError::InvalidToken => ApiError::Unauthorized("Invalid token".to_string()),
            AuthError::TokenExpired => ApiError::TokenExpired,
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ValidationErrorDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid {}", field)),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));

        let message = fields
            .first()
            .map(|f| f.message.clone())
            .unwrap_or_else(|| "Request validation failed".to_string());
        ApiError::Validation { message, fields }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasklane_shared::access::guard::RoleRequirement;
    use tasklane_shared::models::workspace_member::WorkspaceRole;
    use uuid::Uuid;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Task not found".to_string());
        assert_eq!(err.to_string(), "Not found: Task not found");
    }

    #[test]
    fn test_denials_map_by_kind() {
        let hidden: ApiError = ServiceError::Denied {
            action: Action::UpdateProject,
            entity: EntityRef::Project(Uuid::new_v4()),
            denial: Denial::NotMember,
        }
        .into();
        assert_eq!(hidden.status(), StatusCode::NOT_FOUND);
        assert_eq!(hidden.to_string(), "Not found: Project not found or access denied");

        let viewer: ApiError = ServiceError::Denied {
            action: Action::CreateProject,
            entity: EntityRef::Workspace(Uuid::new_v4()),
            denial: Denial::InsufficientRole {
                required: RoleRequirement::Editor,
                actual: WorkspaceRole::Viewer,
            },
        }
        .into();
        assert_eq!(viewer.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            viewer.to_string(),
            "Forbidden: You do not have permission to create projects"
        );

        let blocked: ApiError = ServiceError::Denied {
            action: Action::DeleteProject,
            entity: EntityRef::Project(Uuid::new_v4()),
            denial: Denial::HasTasks(2),
        }
        .into();
        assert_eq!(blocked.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_token_errors() {
        assert_eq!(ApiError::from(TokenError::Expired).code(), "TOKEN_EXPIRED");
        assert_eq!(
            ApiError::from(TokenError::Invalid("bad".to_string())).code(),
            "UNAUTHORIZED"
        );
    }

    #[test]
    fn test_email_conflict() {
        let err = ApiError::from(StoreError::Conflict(constraints::USER_EMAIL.to_string()));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "Conflict: Email already registered");
    }
}
