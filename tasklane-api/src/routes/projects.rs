/// Project and section endpoints
///
/// - `GET    /api/projects` - Projects across the caller's workspaces
/// - `POST   /api/projects` - Create (ADMIN/MEMBER of the workspace)
/// - `GET    /api/projects/:id` - Detail with sections and unsectioned tasks
/// - `PUT    /api/projects/:id` - Update (ADMIN/MEMBER)
/// - `DELETE /api/projects/:id` - Delete (ADMIN, no remaining tasks)
/// - `GET    /api/projects/:id/sections` - Sections with their tasks
/// - `POST   /api/projects/:id/sections` - Append a section
///
/// Every per-project route answers `404` both for a missing project and for
/// one the caller may not act on.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde_json::{json, Value};
use tasklane_shared::{
    auth::middleware::AuthContext,
    services::{
        projects::{self, NewProject, ProjectPatch},
        sections::{self, SectionInput},
    },
};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiPath},
};

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Value>> {
    let projects = projects::list_projects(state.store(), auth.user_id).await?;
    Ok(Json(json!({
        "success": true,
        "total": projects.len(),
        "projects": projects,
    })))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(input): ApiJson<NewProject>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let project = projects::create_project(state.store(), auth.user_id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Project created successfully",
            "project": project,
        })),
    ))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let project = projects::get_project(state.store(), auth.user_id, project_id).await?;
    Ok(Json(json!({ "success": true, "project": project })))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<ProjectPatch>,
) -> ApiResult<Json<Value>> {
    let project = projects::update_project(state.store(), auth.user_id, project_id, patch).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Project updated successfully",
        "project": project,
    })))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    projects::delete_project(state.store(), auth.user_id, project_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Project deleted successfully",
    })))
}

pub async fn list_sections(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let sections = sections::list_sections(state.store(), auth.user_id, project_id).await?;
    Ok(Json(json!({ "success": true, "sections": sections })))
}

pub async fn create_section(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<SectionInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let section = sections::create_section(state.store(), auth.user_id, project_id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Section created successfully",
            "section": section,
        })),
    ))
}
