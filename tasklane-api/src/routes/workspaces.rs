/// Workspace endpoints
///
/// - `GET  /api/workspaces` - Workspaces the caller belongs to, with role
/// - `POST /api/workspaces` - Create a workspace (caller becomes ADMIN)
/// - `GET  /api/workspaces/:id/members` - Member list (any role)
/// - `POST /api/workspaces/:id/members` - Add a member by email (ADMIN)

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde_json::{json, Value};
use tasklane_shared::{
    auth::middleware::AuthContext,
    services::workspaces::{self, NewMember, NewWorkspace},
};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiPath},
};

pub async fn list_workspaces(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Value>> {
    let workspaces = workspaces::list_workspaces(state.store(), auth.user_id).await?;
    Ok(Json(json!({
        "success": true,
        "total": workspaces.len(),
        "workspaces": workspaces,
    })))
}

pub async fn create_workspace(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(input): ApiJson<NewWorkspace>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let workspace = workspaces::create_workspace(state.store(), auth.user_id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Workspace created successfully",
            "workspace": workspace,
        })),
    ))
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(workspace_id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let members = workspaces::list_members(state.store(), auth.user_id, workspace_id).await?;
    Ok(Json(json!({ "success": true, "members": members })))
}

pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(workspace_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<NewMember>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let member = workspaces::add_member(state.store(), auth.user_id, workspace_id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Member added successfully",
            "member": member,
        })),
    ))
}
