/// Subtask, comment, attachment and tag endpoints under `/api/tasks/:id`
///
/// All of them follow the parent task's rule: reads and writes need the
/// caller to own the task or be its assignee, otherwise `404`.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde_json::{json, Value};
use tasklane_shared::{
    auth::middleware::AuthContext,
    models::{attachment::Attachment, subtask::Subtask, tag::Tag},
    services::{
        task_items::{self, AttachmentInput, CommentInput, SubtaskInput, SubtaskPatch, TagInput},
        views::CommentView,
    },
};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiPath},
};

fn deleted() -> Json<Value> {
    Json(json!({ "success": true }))
}

pub async fn list_subtasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Subtask>>> {
    Ok(Json(task_items::list_subtasks(state.store(), auth.user_id, task_id).await?))
}

pub async fn create_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<SubtaskInput>,
) -> ApiResult<(StatusCode, Json<Subtask>)> {
    let subtask = task_items::create_subtask(state.store(), auth.user_id, task_id, input).await?;
    Ok((StatusCode::CREATED, Json(subtask)))
}

pub async fn update_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((task_id, subtask_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(patch): ApiJson<SubtaskPatch>,
) -> ApiResult<Json<Subtask>> {
    Ok(Json(
        task_items::update_subtask(state.store(), auth.user_id, task_id, subtask_id, patch).await?,
    ))
}

pub async fn delete_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((task_id, subtask_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Value>> {
    task_items::delete_subtask(state.store(), auth.user_id, task_id, subtask_id).await?;
    Ok(deleted())
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<CommentView>>> {
    Ok(Json(task_items::list_comments(state.store(), auth.user_id, task_id).await?))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<CommentInput>,
) -> ApiResult<(StatusCode, Json<CommentView>)> {
    let comment = task_items::add_comment(state.store(), auth.user_id, task_id, input).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_attachments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Attachment>>> {
    Ok(Json(
        task_items::list_attachments(state.store(), auth.user_id, task_id).await?,
    ))
}

pub async fn add_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<AttachmentInput>,
) -> ApiResult<(StatusCode, Json<Attachment>)> {
    let attachment = task_items::add_attachment(state.store(), auth.user_id, task_id, input).await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

pub async fn delete_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((task_id, attachment_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Value>> {
    task_items::delete_attachment(state.store(), auth.user_id, task_id, attachment_id).await?;
    Ok(deleted())
}

pub async fn add_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<TagInput>,
) -> ApiResult<(StatusCode, Json<Tag>)> {
    let tag = task_items::add_tag(state.store(), auth.user_id, task_id, input).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn remove_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((task_id, tag_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Value>> {
    task_items::remove_tag(state.store(), auth.user_id, task_id, tag_id).await?;
    Ok(deleted())
}
