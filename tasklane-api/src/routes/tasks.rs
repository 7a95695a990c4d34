/// Task endpoints
///
/// - `GET    /api/tasks[?projectId=]` - Tasks the caller owns or is assigned to
/// - `POST   /api/tasks` - Create; without `projectId` the task lands in the
///   caller's default project, created on first use
/// - `GET    /api/tasks/:id` - Full view (owner or assignee)
/// - `PATCH  /api/tasks/:id` - Partial update (owner or assignee)
/// - `DELETE /api/tasks/:id` - Delete (owner only)
///
/// Task payloads are returned bare rather than wrapped in an envelope.
/// A task the caller may not touch is reported as `404 Task not found`.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde_json::{json, Value};
use tasklane_shared::{
    auth::middleware::AuthContext,
    services::{
        tasks::{self, NewTask, TaskPatch, TaskQuery},
        views::TaskView,
    },
};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiPath, ApiQuery},
};

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiQuery(query): ApiQuery<TaskQuery>,
) -> ApiResult<Json<Vec<TaskView>>> {
    Ok(Json(tasks::list_tasks(state.store(), auth.user_id, query).await?))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(input): ApiJson<NewTask>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    let task = tasks::create_task(state.store(), auth.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
) -> ApiResult<Json<TaskView>> {
    Ok(Json(tasks::get_task(state.store(), auth.user_id, task_id).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<TaskPatch>,
) -> ApiResult<Json<TaskView>> {
    Ok(Json(
        tasks::update_task(state.store(), auth.user_id, task_id, patch).await?,
    ))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    tasks::delete_task(state.store(), auth.user_id, task_id).await?;
    Ok(Json(json!({ "success": true })))
}
