/// Workspace membership model: the (user, workspace, role) relation
///
/// Membership governs every permission decision. Absence of a row means
/// no access at all.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE workspace_role AS ENUM ('ADMIN', 'MEMBER', 'VIEWER');
///
/// CREATE TABLE workspace_members (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     workspace_id UUID NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
///     role workspace_role NOT NULL DEFAULT 'MEMBER',
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (user_id, workspace_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tasklane_shared::models::workspace_member::{
///     WorkspaceMember, CreateWorkspaceMember, WorkspaceRole,
/// };
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, workspace_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// WorkspaceMember::create(&pool, CreateWorkspaceMember {
///     workspace_id,
///     user_id,
///     role: WorkspaceRole::Viewer,
/// }).await?;
///
/// let role = WorkspaceMember::find_role(&pool, workspace_id, user_id).await?;
/// assert_eq!(role, Some(WorkspaceRole::Viewer));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Role of a user within one workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "workspace_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkspaceRole {
    /// Manages members and may delete projects
    Admin,

    /// Creates and edits projects and sections
    Member,

    /// Read-only on workspace structure
    Viewer,
}

impl WorkspaceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceRole::Admin => "ADMIN",
            WorkspaceRole::Member => "MEMBER",
            WorkspaceRole::Viewer => "VIEWER",
        }
    }

    /// True for ADMIN and MEMBER
    pub fn can_edit(&self) -> bool {
        matches!(self, WorkspaceRole::Admin | WorkspaceRole::Member)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, WorkspaceRole::Admin)
    }
}

impl std::fmt::Display for WorkspaceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkspaceRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(WorkspaceRole::Admin),
            "MEMBER" => Ok(WorkspaceRole::Member),
            "VIEWER" => Ok(WorkspaceRole::Viewer),
            other => Err(format!("unknown workspace role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMember {
    pub id: Uuid,
    pub user_id: Uuid,
    pub workspace_id: Uuid,
    pub role: WorkspaceRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateWorkspaceMember {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: WorkspaceRole,
}

impl WorkspaceMember {
    /// Adds a user to a workspace.
    ///
    /// # Errors
    ///
    /// Unique violation on `workspace_members_user_id_workspace_id_key` when
    /// the user is already a member.
    pub async fn create(pool: &PgPool, data: CreateWorkspaceMember) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, WorkspaceMember>(
            r#"
            INSERT INTO workspace_members (user_id, workspace_id, role)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, workspace_id, role, joined_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.workspace_id)
        .bind(data.role)
        .fetch_one(pool)
        .await
    }

    /// Single lookup by the composite key
    pub async fn find_role(
        pool: &PgPool,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<WorkspaceRole>, sqlx::Error> {
        let row: Option<(WorkspaceRole,)> = sqlx::query_as(
            r#"
            SELECT role
            FROM workspace_members
            WHERE workspace_id = $1 AND user_id = $2
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|(role,)| role))
    }

    pub async fn list_by_workspace(
        pool: &PgPool,
        workspace_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, WorkspaceMember>(
            r#"
            SELECT id, user_id, workspace_id, role, joined_at
            FROM workspace_members
            WHERE workspace_id = $1
            ORDER BY joined_at ASC
            "#,
        )
        .bind(workspace_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_capabilities() {
        assert!(WorkspaceRole::Admin.can_edit());
        assert!(WorkspaceRole::Member.can_edit());
        assert!(!WorkspaceRole::Viewer.can_edit());

        assert!(WorkspaceRole::Admin.is_admin());
        assert!(!WorkspaceRole::Member.is_admin());
    }

    #[test]
    fn test_role_wire_format() {
        assert_eq!(
            serde_json::to_string(&WorkspaceRole::Member).unwrap(),
            "\"MEMBER\""
        );
        let parsed: WorkspaceRole = serde_json::from_str("\"VIEWER\"").unwrap();
        assert_eq!(parsed, WorkspaceRole::Viewer);
        assert!(serde_json::from_str::<WorkspaceRole>("\"viewer\"").is_err());
        assert_eq!("ADMIN".parse::<WorkspaceRole>(), Ok(WorkspaceRole::Admin));
    }
}
