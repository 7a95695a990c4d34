/// Persistence seam
///
/// Every access-control and mutation component talks to storage through the
/// [`Store`] trait and never touches SQL directly. Two backends exist:
///
/// - [`PgStore`]: Postgres via `sqlx`, delegating to the model types
/// - [`MemoryStore`]: in-process maps behind a `tokio::sync::RwLock`, used
///   by tests and by the server when no `DATABASE_URL` is configured
///
/// Both enforce the same unique constraints and cascades, and both report
/// them through [`StoreError`].
///
/// # Example
///
/// ```
/// use tasklane_shared::store::{MemoryStore, Store};
/// use tasklane_shared::models::user::CreateUser;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), tasklane_shared::store::StoreError> {
/// let store = MemoryStore::new();
/// let user = store.create_user(CreateUser {
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: None,
/// }).await?;
///
/// assert!(store.find_user_by_email("ada@example.com").await?.is_some());
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

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

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Constraint names shared by both backends
pub mod constraints {
    pub const USER_EMAIL: &str = "users_email_key";
    pub const SESSION_TOKEN_HASH: &str = "sessions_token_hash_key";
    pub const WORKSPACE_SLUG: &str = "workspaces_slug_key";
    pub const WORKSPACE_MEMBER: &str = "workspace_members_user_id_workspace_id_key";
    pub const PROJECT_NAME: &str = "projects_workspace_id_name_key";
    pub const TAG_NAME: &str = "tags_name_key";
}

/// Storage failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; carries the constraint name
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// A foreign key pointed at a row that does not exist
    #[error("referenced row does not exist: {0}")]
    InvalidReference(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// Whether this is a unique violation on `constraint`
    pub fn is_conflict_on(&self, constraint: &str) -> bool {
        matches!(self, StoreError::Conflict(name) if name == constraint)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let constraint = db.constraint().unwrap_or("unknown").to_string();
            if db.is_unique_violation() {
                return StoreError::Conflict(constraint);
            }
            if db.is_foreign_key_violation() {
                return StoreError::InvalidReference(constraint);
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Relational data API consumed by the core
///
/// Lookups return `Ok(None)` for missing rows; deletes return whether a row
/// was removed. Listing order is part of each method's contract.
#[async_trait]
pub trait Store: Send + Sync {
    /// Connectivity probe for health checks
    async fn ping(&self) -> StoreResult<()>;

    // Users

    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn record_login(&self, id: Uuid) -> StoreResult<()>;

    // Sessions

    async fn create_session(&self, data: CreateSession) -> StoreResult<Session>;
    async fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>>;
    async fn delete_session(&self, token_hash: &str) -> StoreResult<bool>;
    /// Removes sessions with `expires_at <= now`, returning how many
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64>;

    // Workspaces and membership

    /// Creates the workspace and an ADMIN membership for `creator_id`
    async fn create_workspace(&self, data: CreateWorkspace) -> StoreResult<Workspace>;
    async fn find_workspace(&self, id: Uuid) -> StoreResult<Option<Workspace>>;
    /// Workspace of the user's oldest membership
    async fn first_workspace_for_user(&self, user_id: Uuid) -> StoreResult<Option<Workspace>>;
    /// Oldest membership first
    async fn list_workspaces_for_user(&self, user_id: Uuid) -> StoreResult<Vec<WorkspaceMembership>>;
    async fn add_member(&self, data: CreateWorkspaceMember) -> StoreResult<WorkspaceMember>;
    async fn find_role(&self, workspace_id: Uuid, user_id: Uuid) -> StoreResult<Option<WorkspaceRole>>;
    /// Oldest membership first
    async fn list_members(&self, workspace_id: Uuid) -> StoreResult<Vec<WorkspaceMember>>;

    // Projects

    async fn create_project(&self, data: CreateProject) -> StoreResult<Project>;
    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>>;
    /// Oldest project in the workspace
    async fn first_project_in_workspace(&self, workspace_id: Uuid) -> StoreResult<Option<Project>>;
    /// Newest first
    async fn list_projects(&self, workspace_id: Uuid) -> StoreResult<Vec<Project>>;
    async fn update_project(&self, id: Uuid, data: UpdateProject) -> StoreResult<Option<Project>>;
    /// Cascades to sections
    async fn delete_project(&self, id: Uuid) -> StoreResult<bool>;
    async fn project_counts(&self, id: Uuid) -> StoreResult<ProjectCounts>;

    // Sections

    /// Inserts all sections atomically, returned in input order
    async fn create_sections(&self, project_id: Uuid, sections: Vec<NewSection>) -> StoreResult<Vec<Section>>;
    async fn find_section(&self, id: Uuid) -> StoreResult<Option<Section>>;
    /// Ascending by order
    async fn list_sections(&self, project_id: Uuid) -> StoreResult<Vec<Section>>;
    async fn max_section_order(&self, project_id: Uuid) -> StoreResult<Option<i32>>;
    async fn count_section_tasks(&self, section_id: Uuid) -> StoreResult<i64>;

    // Tasks

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task>;
    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>>;
    /// Ascending by order, then creation time
    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>>;
    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>>;
    /// Cascades to subtasks, comments, attachments and tag links
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;
    /// Highest order among tasks with this exact (project, section) pair
    async fn max_task_order(&self, project_id: Uuid, section_id: Option<Uuid>) -> StoreResult<Option<i32>>;
    async fn task_counts(&self, id: Uuid) -> StoreResult<TaskCounts>;

    // Task children

    async fn create_subtask(&self, data: CreateSubtask) -> StoreResult<Subtask>;
    /// Ascending by order
    async fn list_subtasks(&self, task_id: Uuid) -> StoreResult<Vec<Subtask>>;
    async fn max_subtask_order(&self, task_id: Uuid) -> StoreResult<Option<i32>>;
    async fn update_subtask(&self, task_id: Uuid, id: Uuid, data: UpdateSubtask) -> StoreResult<Option<Subtask>>;
    async fn delete_subtask(&self, task_id: Uuid, id: Uuid) -> StoreResult<bool>;

    async fn create_comment(&self, data: CreateComment) -> StoreResult<Comment>;
    /// Newest first, capped at `limit` when given
    async fn list_comments(&self, task_id: Uuid, limit: Option<i64>) -> StoreResult<Vec<Comment>>;

    async fn create_attachment(&self, data: CreateAttachment) -> StoreResult<Attachment>;
    /// Newest first
    async fn list_attachments(&self, task_id: Uuid) -> StoreResult<Vec<Attachment>>;
    async fn delete_attachment(&self, task_id: Uuid, id: Uuid) -> StoreResult<bool>;

    /// Get-or-create by name; an existing tag keeps its color
    async fn upsert_tag(&self, name: &str, color: &str) -> StoreResult<Tag>;
    /// Idempotent
    async fn attach_tag(&self, task_id: Uuid, tag_id: Uuid) -> StoreResult<()>;
    async fn detach_tag(&self, task_id: Uuid, tag_id: Uuid) -> StoreResult<bool>;
    /// Alphabetical
    async fn list_task_tags(&self, task_id: Uuid) -> StoreResult<Vec<Tag>>;
}
