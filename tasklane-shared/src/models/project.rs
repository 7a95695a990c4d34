/// Project model and database operations
///
/// Projects belong to exactly one workspace and are unique by name within
/// it. Deleting a project cascades to its sections; the `tasks` foreign key
/// is `ON DELETE RESTRICT`, so a project that still owns tasks cannot be
/// removed at the storage level either.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     workspace_id UUID NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     color VARCHAR(32) NOT NULL DEFAULT '#0066FF',
///     icon VARCHAR(64),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (workspace_id, name)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Color given to projects created without one
pub const DEFAULT_PROJECT_COLOR: &str = "#0066FF";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateProject {
    pub workspace_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: Option<String>,
}

/// Partial update. `None` leaves a field untouched; for the nullable
/// fields `Some(None)` clears the column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub color: Option<String>,
    pub icon: Option<Option<String>>,
}

impl UpdateProject {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.color.is_none()
            && self.icon.is_none()
    }
}

/// Child counts reported alongside a project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCounts {
    pub tasks: i64,
    pub sections: i64,
}

const PROJECT_COLUMNS: &str =
    "id, workspace_id, name, description, color, icon, created_at, updated_at";

impl Project {
    /// # Errors
    ///
    /// Unique violation on `projects_workspace_id_name_key` for a duplicate
    /// name, foreign-key violation if the workspace does not exist.
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects (workspace_id, name, description, color, icon)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        ))
        .bind(data.workspace_id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.color)
        .bind(&data.icon)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects WHERE id = $1",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Oldest project in a workspace
    pub async fn first_in_workspace(
        pool: &PgPool,
        workspace_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {} FROM projects
            WHERE workspace_id = $1
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#,
            PROJECT_COLUMNS
        ))
        .bind(workspace_id)
        .fetch_optional(pool)
        .await
    }

    /// Newest first
    pub async fn list_by_workspace(
        pool: &PgPool,
        workspace_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {} FROM projects
            WHERE workspace_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
            PROJECT_COLUMNS
        ))
        .bind(workspace_id)
        .fetch_all(pool)
        .await
    }

    /// Applies the supplied fields only. Returns `None` if the project is gone.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE projects SET updated_at = NOW()");

        if let Some(name) = data.name {
            query.push(", name = ").push_bind(name);
        }
        if let Some(description) = data.description {
            query.push(", description = ").push_bind(description);
        }
        if let Some(color) = data.color {
            query.push(", color = ").push_bind(color);
        }
        if let Some(icon) = data.icon {
            query.push(", icon = ").push_bind(icon);
        }

        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(PROJECT_COLUMNS);

        query.build_query_as::<Project>().fetch_optional(pool).await
    }

    /// Deletes the project and, by cascade, its sections
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn counts(pool: &PgPool, id: Uuid) -> Result<ProjectCounts, sqlx::Error> {
        sqlx::query_as::<_, ProjectCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM tasks WHERE project_id = $1) AS tasks,
                (SELECT COUNT(*) FROM sections WHERE project_id = $1) AS sections
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }
}
