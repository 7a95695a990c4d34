/// Task model and database operations
///
/// A task belongs to a project and optionally to one of its sections
/// (`section_id = NULL` is the unsectioned backlog). It is visible to its
/// owner and its assignee only.
///
/// # Status transitions
///
/// ```text
/// TODO ⇄ IN_PROGRESS ⇄ REVIEW ⇄ COMPLETED
/// any → ARCHIVED, ARCHIVED → any
/// ```
///
/// No status is terminal. `completed_at` is non-null exactly when the status
/// is COMPLETED; the mutators enforce this, not the schema.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE RESTRICT,
///     section_id UUID REFERENCES sections(id) ON DELETE SET NULL,
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     title VARCHAR(500) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'TODO',
///     priority task_priority NOT NULL DEFAULT 'MEDIUM',
///     due_date TIMESTAMPTZ,
///     completed_at TIMESTAMPTZ,
///     "order" INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tasklane_shared::models::task::{Task, TaskFilter};
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// // Everything the user owns or is assigned to
/// let mine = Task::list(&pool, &TaskFilter::involving(user_id)).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Task workflow status
///
/// Declaration order is the list sort order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Completed,
    Archived,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

impl TaskStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

/// Task priority; `Urgent` sorts highest
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub section_id: Option<Uuid>,
    pub owner_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Owner or assignee
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id || self.assignee_id == Some(user_id)
    }
}

/// Fully resolved insert; defaults and ordering are decided by the caller
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub section_id: Option<Uuid>,
    pub owner_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub order: i32,
}

/// Partial update. `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub assignee_id: Option<Option<Uuid>>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

/// Conjunctive filter over tasks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub project_id: Option<Uuid>,

    /// `Some(None)` selects unsectioned tasks
    pub section_id: Option<Option<Uuid>>,

    /// Tasks owned by or assigned to this user
    pub involving_user: Option<Uuid>,
}

impl TaskFilter {
    pub fn involving(user_id: Uuid) -> Self {
        TaskFilter {
            involving_user: Some(user_id),
            ..Default::default()
        }
    }

    pub fn in_project(project_id: Uuid) -> Self {
        TaskFilter {
            project_id: Some(project_id),
            ..Default::default()
        }
    }

    pub fn in_section(project_id: Uuid, section_id: Option<Uuid>) -> Self {
        TaskFilter {
            project_id: Some(project_id),
            section_id: Some(section_id),
            involving_user: None,
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.project_id.map_or(true, |id| task.project_id == id)
            && self.section_id.map_or(true, |id| task.section_id == id)
            && self.involving_user.map_or(true, |id| task.involves(id))
    }
}

/// Child counts reported alongside a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskCounts {
    pub subtasks: i64,
    pub comments: i64,
    pub attachments: i64,
}

const TASK_COLUMNS: &str = r#"id, project_id, section_id, owner_id, assignee_id, title, description,
    status, priority, due_date, completed_at, "order", created_at, updated_at"#;

impl Task {
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (
                project_id, section_id, owner_id, assignee_id, title, description,
                status, priority, due_date, completed_at, "order"
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(data.project_id)
        .bind(data.section_id)
        .bind(data.owner_id)
        .bind(data.assignee_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.due_date)
        .bind(data.completed_at)
        .bind(data.order)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Tasks matching `filter`, by order then creation time
    pub async fn list(pool: &PgPool, filter: &TaskFilter) -> Result<Vec<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
        query.push(TASK_COLUMNS).push(" FROM tasks WHERE TRUE");

        if let Some(project_id) = filter.project_id {
            query.push(" AND project_id = ").push_bind(project_id);
        }
        match filter.section_id {
            Some(Some(section_id)) => {
                query.push(" AND section_id = ").push_bind(section_id);
            }
            Some(None) => {
                query.push(" AND section_id IS NULL");
            }
            None => {}
        }
        if let Some(user_id) = filter.involving_user {
            query
                .push(" AND (owner_id = ")
                .push_bind(user_id)
                .push(" OR assignee_id = ")
                .push_bind(user_id)
                .push(")");
        }

        query.push(r#" ORDER BY "order" ASC, created_at ASC"#);

        query.build_query_as::<Task>().fetch_all(pool).await
    }

    /// Applies the supplied fields only. Returns `None` if the task is gone.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE tasks SET updated_at = NOW()");

        if let Some(title) = data.title {
            query.push(", title = ").push_bind(title);
        }
        if let Some(description) = data.description {
            query.push(", description = ").push_bind(description);
        }
        if let Some(status) = data.status {
            query.push(", status = ").push_bind(status);
        }
        if let Some(priority) = data.priority {
            query.push(", priority = ").push_bind(priority);
        }
        if let Some(due_date) = data.due_date {
            query.push(", due_date = ").push_bind(due_date);
        }
        if let Some(assignee_id) = data.assignee_id {
            query.push(", assignee_id = ").push_bind(assignee_id);
        }
        if let Some(completed_at) = data.completed_at {
            query.push(", completed_at = ").push_bind(completed_at);
        }

        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(TASK_COLUMNS);

        query.build_query_as::<Task>().fetch_optional(pool).await
    }

    /// Deletes the task and, by cascade, its subtasks, comments,
    /// attachments and tag links
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Highest order among tasks sharing the project and section
    pub async fn max_order(
        pool: &PgPool,
        project_id: Uuid,
        section_id: Option<Uuid>,
    ) -> Result<Option<i32>, sqlx::Error> {
        let (max,): (Option<i32>,) = sqlx::query_as(
            r#"
            SELECT MAX("order") FROM tasks
            WHERE project_id = $1 AND section_id IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(project_id)
        .bind(section_id)
        .fetch_one(pool)
        .await?;

        Ok(max)
    }

    pub async fn counts(pool: &PgPool, id: Uuid) -> Result<TaskCounts, sqlx::Error> {
        sqlx::query_as::<_, TaskCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM subtasks WHERE task_id = $1) AS subtasks,
                (SELECT COUNT(*) FROM comments WHERE task_id = $1) AS comments,
                (SELECT COUNT(*) FROM attachments WHERE task_id = $1) AS attachments
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(owner_id: Uuid, assignee_id: Option<Uuid>) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            section_id: None,
            owner_id,
            assignee_id,
            title: "Write report".to_string(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            completed_at: None,
            order: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_order_follows_declaration() {
        assert!(TaskStatus::Todo < TaskStatus::InProgress);
        assert!(TaskStatus::Review < TaskStatus::Completed);
        assert!(TaskStatus::Completed < TaskStatus::Archived);
        assert!(TaskPriority::Urgent > TaskPriority::High);
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
        assert!(serde_json::from_str::<TaskStatus>("\"DONE\"").is_err());
    }

    #[test]
    fn test_involves() {
        let owner = Uuid::new_v4();
        let assignee = Uuid::new_v4();
        let t = task(owner, Some(assignee));

        assert!(t.involves(owner));
        assert!(t.involves(assignee));
        assert!(!t.involves(Uuid::new_v4()));
    }

    #[test]
    fn test_filter_matches() {
        let owner = Uuid::new_v4();
        let t = task(owner, None);

        assert!(TaskFilter::involving(owner).matches(&t));
        assert!(TaskFilter::in_section(t.project_id, None).matches(&t));
        assert!(!TaskFilter::in_section(t.project_id, Some(Uuid::new_v4())).matches(&t));
        assert!(!TaskFilter::in_project(Uuid::new_v4()).matches(&t));
    }
}
