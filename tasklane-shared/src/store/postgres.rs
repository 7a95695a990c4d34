/// Postgres-backed [`Store`]
///
/// Each method delegates to the inherent SQL on the model type and converts
/// `sqlx::Error` into [`StoreError`] so unique and foreign-key violations
/// surface as `Conflict` / `InvalidReference`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreResult};
use crate::db::pool::health_check;
use crate::models::attachment::{Attachment, CreateAttachment};
use crate::models::comment::{Comment, CreateComment};
use crate::models::project::{CreateProject, Project, ProjectCounts, UpdateProject};
use crate::models::section::{NewSection, Section};
use crate::models::session::{CreateSession, Session};
use crate::models::subtask::{CreateSubtask, Subtask, UpdateSubtask};
use crate::models::tag::Tag;
use crate::models::task::{CreateTask, Task, TaskCounts, TaskFilter, UpdateTask};
use crate::models::user::{CreateUser, User};
use crate::models::workspace::{CreateWorkspace, Workspace, WorkspaceMembership};
use crate::models::workspace_member::{CreateWorkspaceMember, WorkspaceMember, WorkspaceRole};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<()> {
        User::update_last_login(&self.pool, id).await?;
        Ok(())
    }

    async fn create_session(&self, data: CreateSession) -> StoreResult<Session> {
        Ok(Session::create(&self.pool, data).await?)
    }

    async fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        Ok(Session::find_by_token_hash(&self.pool, token_hash).await?)
    }

    async fn delete_session(&self, token_hash: &str) -> StoreResult<bool> {
        Ok(Session::delete_by_token_hash(&self.pool, token_hash).await?)
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        Ok(Session::delete_expired(&self.pool, now).await?)
    }

    async fn create_workspace(&self, data: CreateWorkspace) -> StoreResult<Workspace> {
        Ok(Workspace::create(&self.pool, data).await?)
    }

    async fn find_workspace(&self, id: Uuid) -> StoreResult<Option<Workspace>> {
        Ok(Workspace::find_by_id(&self.pool, id).await?)
    }

    async fn first_workspace_for_user(&self, user_id: Uuid) -> StoreResult<Option<Workspace>> {
        Ok(Workspace::first_for_user(&self.pool, user_id).await?)
    }

    async fn list_workspaces_for_user(&self, user_id: Uuid) -> StoreResult<Vec<WorkspaceMembership>> {
        Ok(Workspace::list_for_user(&self.pool, user_id).await?)
    }

    async fn add_member(&self, data: CreateWorkspaceMember) -> StoreResult<WorkspaceMember> {
        Ok(WorkspaceMember::create(&self.pool, data).await?)
    }

    async fn find_role(&self, workspace_id: Uuid, user_id: Uuid) -> StoreResult<Option<WorkspaceRole>> {
        Ok(WorkspaceMember::find_role(&self.pool, workspace_id, user_id).await?)
    }

    async fn list_members(&self, workspace_id: Uuid) -> StoreResult<Vec<WorkspaceMember>> {
        Ok(WorkspaceMember::list_by_workspace(&self.pool, workspace_id).await?)
    }

    async fn create_project(&self, data: CreateProject) -> StoreResult<Project> {
        Ok(Project::create(&self.pool, data).await?)
    }

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(Project::find_by_id(&self.pool, id).await?)
    }

    async fn first_project_in_workspace(&self, workspace_id: Uuid) -> StoreResult<Option<Project>> {
        Ok(Project::first_in_workspace(&self.pool, workspace_id).await?)
    }

    async fn list_projects(&self, workspace_id: Uuid) -> StoreResult<Vec<Project>> {
        Ok(Project::list_by_workspace(&self.pool, workspace_id).await?)
    }

    async fn update_project(&self, id: Uuid, data: UpdateProject) -> StoreResult<Option<Project>> {
        Ok(Project::update(&self.pool, id, data).await?)
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Project::delete(&self.pool, id).await?)
    }

    async fn project_counts(&self, id: Uuid) -> StoreResult<ProjectCounts> {
        Ok(Project::counts(&self.pool, id).await?)
    }

    async fn create_sections(&self, project_id: Uuid, sections: Vec<NewSection>) -> StoreResult<Vec<Section>> {
        Ok(Section::create_many(&self.pool, project_id, sections).await?)
    }

    async fn find_section(&self, id: Uuid) -> StoreResult<Option<Section>> {
        Ok(Section::find_by_id(&self.pool, id).await?)
    }

    async fn list_sections(&self, project_id: Uuid) -> StoreResult<Vec<Section>> {
        Ok(Section::list_by_project(&self.pool, project_id).await?)
    }

    async fn max_section_order(&self, project_id: Uuid) -> StoreResult<Option<i32>> {
        Ok(Section::max_order(&self.pool, project_id).await?)
    }

    async fn count_section_tasks(&self, section_id: Uuid) -> StoreResult<i64> {
        Ok(Section::count_tasks(&self.pool, section_id).await?)
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, data).await?)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        Ok(Task::list(&self.pool, filter).await?)
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>> {
        Ok(Task::update(&self.pool, id, data).await?)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn max_task_order(&self, project_id: Uuid, section_id: Option<Uuid>) -> StoreResult<Option<i32>> {
        Ok(Task::max_order(&self.pool, project_id, section_id).await?)
    }

    async fn task_counts(&self, id: Uuid) -> StoreResult<TaskCounts> {
        Ok(Task::counts(&self.pool, id).await?)
    }

    async fn create_subtask(&self, data: CreateSubtask) -> StoreResult<Subtask> {
        Ok(Subtask::create(&self.pool, data).await?)
    }

    async fn list_subtasks(&self, task_id: Uuid) -> StoreResult<Vec<Subtask>> {
        Ok(Subtask::list_by_task(&self.pool, task_id).await?)
    }

    async fn max_subtask_order(&self, task_id: Uuid) -> StoreResult<Option<i32>> {
        Ok(Subtask::max_order(&self.pool, task_id).await?)
    }

    async fn update_subtask(&self, task_id: Uuid, id: Uuid, data: UpdateSubtask) -> StoreResult<Option<Subtask>> {
        Ok(Subtask::update(&self.pool, task_id, id, data).await?)
    }

    async fn delete_subtask(&self, task_id: Uuid, id: Uuid) -> StoreResult<bool> {
        Ok(Subtask::delete(&self.pool, task_id, id).await?)
    }

    async fn create_comment(&self, data: CreateComment) -> StoreResult<Comment> {
        Ok(Comment::create(&self.pool, data).await?)
    }

    async fn list_comments(&self, task_id: Uuid, limit: Option<i64>) -> StoreResult<Vec<Comment>> {
        Ok(Comment::list_by_task(&self.pool, task_id, limit).await?)
    }

    async fn create_attachment(&self, data: CreateAttachment) -> StoreResult<Attachment> {
        Ok(Attachment::create(&self.pool, data).await?)
    }

    async fn list_attachments(&self, task_id: Uuid) -> StoreResult<Vec<Attachment>> {
        Ok(Attachment::list_by_task(&self.pool, task_id).await?)
    }

    async fn delete_attachment(&self, task_id: Uuid, id: Uuid) -> StoreResult<bool> {
        Ok(Attachment::delete(&self.pool, task_id, id).await?)
    }

    async fn upsert_tag(&self, name: &str, color: &str) -> StoreResult<Tag> {
        Ok(Tag::get_or_create(&self.pool, name, color).await?)
    }

    async fn attach_tag(&self, task_id: Uuid, tag_id: Uuid) -> StoreResult<()> {
        Ok(Tag::attach(&self.pool, task_id, tag_id).await?)
    }

    async fn detach_tag(&self, task_id: Uuid, tag_id: Uuid) -> StoreResult<bool> {
        Ok(Tag::detach(&self.pool, task_id, tag_id).await?)
    }

    async fn list_task_tags(&self, task_id: Uuid) -> StoreResult<Vec<Tag>> {
        Ok(Tag::list_by_task(&self.pool, task_id).await?)
    }
}
