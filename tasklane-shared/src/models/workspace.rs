/// Workspace model and database operations
///
/// A workspace is the tenant boundary. Every project, section and task
/// resolves to exactly one workspace, and every permission check is made
/// against the caller's membership row in it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE workspaces (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     slug VARCHAR(255) NOT NULL UNIQUE,
///     description TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tasklane_shared::models::workspace::{Workspace, CreateWorkspace};
/// use tasklane_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(creator_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// // The creator is granted ADMIN in the same transaction
/// let workspace = Workspace::create(&pool, CreateWorkspace {
///     name: "Acme".to_string(),
///     slug: "acme".to_string(),
///     description: None,
///     creator_id,
/// }).await?;
///
/// let mine = Workspace::list_for_user(&pool, creator_id).await?;
/// assert!(mine.iter().any(|m| m.workspace.id == workspace.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::workspace_member::WorkspaceRole;

/// A tenant container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: Uuid,

    pub name: String,

    /// URL-safe identifier, unique across all workspaces
    pub slug: String,

    pub description: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a workspace
///
/// `creator_id` receives an ADMIN membership atomically with the insert.
#[derive(Debug, Clone)]
pub struct CreateWorkspace {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub creator_id: Uuid,
}

/// A workspace seen through one user's membership
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMembership {
    #[serde(flatten)]
    pub workspace: Workspace,
    pub role: WorkspaceRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct MembershipRow {
    id: Uuid,
    name: String,
    slug: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    role: WorkspaceRole,
    joined_at: DateTime<Utc>,
}

impl From<MembershipRow> for WorkspaceMembership {
    fn from(row: MembershipRow) -> Self {
        WorkspaceMembership {
            workspace: Workspace {
                id: row.id,
                name: row.name,
                slug: row.slug,
                description: row.description,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            role: row.role,
            joined_at: row.joined_at,
        }
    }
}

impl Workspace {
    /// Creates a workspace and grants the creator ADMIN.
    ///
    /// Both rows are written in one transaction, so a workspace never
    /// exists without its first administrator.
    ///
    /// # Errors
    ///
    /// Unique violation on `workspaces_slug_key` if the slug is taken.
    pub async fn create(pool: &PgPool, data: CreateWorkspace) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let workspace = sqlx::query_as::<_, Workspace>(
            r#"
            INSERT INTO workspaces (name, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id, name, slug, description, created_at, updated_at
            "#,
        )
        .bind(&data.name)
        .bind(&data.slug)
        .bind(&data.description)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO workspace_members (user_id, workspace_id, role)
            VALUES ($1, $2, 'ADMIN')
            "#,
        )
        .bind(data.creator_id)
        .bind(workspace.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(workspace)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Workspace>(
            r#"
            SELECT id, name, slug, description, created_at, updated_at
            FROM workspaces
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// The workspace the user joined first, if any
    pub async fn first_for_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Workspace>(
            r#"
            SELECT w.id, w.name, w.slug, w.description, w.created_at, w.updated_at
            FROM workspaces w
            INNER JOIN workspace_members m ON m.workspace_id = w.id
            WHERE m.user_id = $1
            ORDER BY m.joined_at ASC, w.id ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// All workspaces the user belongs to, oldest membership first
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<WorkspaceMembership>, sqlx::Error> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT w.id, w.name, w.slug, w.description, w.created_at, w.updated_at,
                   m.role, m.joined_at
            FROM workspaces w
            INNER JOIN workspace_members m ON m.workspace_id = w.id
            WHERE m.user_id = $1
            ORDER BY m.joined_at ASC, w.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(WorkspaceMembership::from).collect())
    }
}

/// Lowercases `name`, keeps ASCII alphanumerics and collapses everything
/// else into single dashes.
///
/// ```
/// use tasklane_shared::models::workspace::slugify;
///
/// assert_eq!(slugify("  Acme & Co. Ltd "), "acme-co-ltd");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Workspace"), "my-workspace");
        assert_eq!(slugify("--Team__42--"), "team-42");
        assert_eq!(slugify("日本"), "");
    }

    #[test]
    fn test_membership_serializes_flat() {
        let now = Utc::now();
        let membership = WorkspaceMembership {
            workspace: Workspace {
                id: Uuid::new_v4(),
                name: "Acme".to_string(),
                slug: "acme".to_string(),
                description: None,
                created_at: now,
                updated_at: now,
            },
            role: WorkspaceRole::Viewer,
            joined_at: now,
        };

        let json = serde_json::to_value(&membership).unwrap();
        assert_eq!(json["slug"], "acme");
        assert_eq!(json["role"], "VIEWER");
        assert!(json.get("joinedAt").is_some());
    }
}
