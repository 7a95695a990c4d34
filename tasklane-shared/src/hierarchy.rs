/// Hierarchy manager: default containers and sibling ordering
///
/// # Default container
///
/// A task created without a project lands in the caller's default
/// container. [`HierarchyManager::ensure_default_container`] finds the
/// caller's oldest workspace (creating "My Workspace" with the caller as
/// ADMIN if there is none), then that workspace's oldest project (creating
/// "Personal Tasks" with To Do / In Progress / Done if there is none).
///
/// The check-then-create is not transactional. If two first-time calls race,
/// the loser's insert hits the workspace slug or project name constraint and
/// it re-reads what the winner created, so the usual outcome is still a
/// single default workspace and project.
///
/// # Ordering
///
/// `next_*_order` returns the highest sibling order plus one, or 1 with no
/// siblings. The read and the subsequent insert are separate statements, so
/// concurrent creates may pick the same order. Order is a display hint, not
/// a key.
///
/// # Example
///
/// ```
/// use tasklane_shared::hierarchy::HierarchyManager;
/// use tasklane_shared::models::user::CreateUser;
/// use tasklane_shared::store::{MemoryStore, Store};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), tasklane_shared::error::ServiceError> {
/// let store = MemoryStore::new();
/// let user = store.create_user(CreateUser {
///     email: "new@example.com".into(),
///     password_hash: "x".into(),
///     name: None,
/// }).await?;
///
/// let hierarchy = HierarchyManager::new(&store);
/// let first = hierarchy.ensure_default_container(user.id).await?;
/// let second = hierarchy.ensure_default_container(user.id).await?;
/// assert_eq!(first, second);
/// # Ok(())
/// # }
/// ```

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::project::{CreateProject, Project};
use crate::models::section::NewSection;
use crate::models::workspace::{CreateWorkspace, Workspace};
use crate::store::{constraints, Store, StoreResult};

pub const DEFAULT_WORKSPACE_NAME: &str = "My Workspace";
pub const DEFAULT_PROJECT_NAME: &str = "Personal Tasks";
pub const DEFAULT_PROJECT_DESCRIPTION: &str = "Your personal task list";
pub const DEFAULT_PROJECT_COLOR: &str = "#3B82F6";

/// Sections of a bootstrapped project, ordered from 0
pub const BOOTSTRAP_SECTIONS: [&str; 3] = ["To Do", "In Progress", "Done"];

/// Sections added when a project is created with default sections, ordered from 1
pub const CANONICAL_SECTIONS: [&str; 4] = ["To Do", "In Progress", "Review", "Done"];

/// Slug of a user's auto-provisioned workspace
pub fn default_workspace_slug(user_id: Uuid) -> String {
    format!("workspace-{}", user_id)
}

/// `names` as sections with orders `first, first + 1, ...`
pub fn numbered_sections(names: &[&str], first: i32) -> Vec<NewSection> {
    names
        .iter()
        .zip(first..)
        .map(|(name, order)| NewSection::new(*name, order))
        .collect()
}

fn next_after(max: Option<i32>) -> i32 {
    max.unwrap_or(0) + 1
}

pub struct HierarchyManager<'a> {
    store: &'a dyn Store,
}

impl<'a> HierarchyManager<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        HierarchyManager { store }
    }

    /// Project id of the caller's default container, provisioning it if needed
    pub async fn ensure_default_container(&self, user_id: Uuid) -> ServiceResult<Uuid> {
        let workspace = self.ensure_default_workspace(user_id).await?;
        let project = self.ensure_default_project(&workspace).await?;
        Ok(project.id)
    }

    async fn ensure_default_workspace(&self, user_id: Uuid) -> ServiceResult<Workspace> {
        if let Some(workspace) = self.store.first_workspace_for_user(user_id).await? {
            return Ok(workspace);
        }

        let created = self
            .store
            .create_workspace(CreateWorkspace {
                name: DEFAULT_WORKSPACE_NAME.to_string(),
                slug: default_workspace_slug(user_id),
                description: None,
                creator_id: user_id,
            })
            .await;

        match created {
            Ok(workspace) => {
                info!(user_id = %user_id, workspace_id = %workspace.id, "Provisioned default workspace");
                Ok(workspace)
            }
            Err(e) if e.is_conflict_on(constraints::WORKSPACE_SLUG) => {
                warn!(user_id = %user_id, "Default workspace created concurrently, re-reading");
                self.store
                    .first_workspace_for_user(user_id)
                    .await?
                    .ok_or_else(|| ServiceError::conflict("Default workspace slug is already taken"))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_default_project(&self, workspace: &Workspace) -> ServiceResult<Project> {
        if let Some(project) = self.store.first_project_in_workspace(workspace.id).await? {
            return Ok(project);
        }

        let created = self
            .store
            .create_project(CreateProject {
                workspace_id: workspace.id,
                name: DEFAULT_PROJECT_NAME.to_string(),
                description: Some(DEFAULT_PROJECT_DESCRIPTION.to_string()),
                color: DEFAULT_PROJECT_COLOR.to_string(),
                icon: None,
            })
            .await;

        let project = match created {
            Ok(project) => project,
            Err(e) if e.is_conflict_on(constraints::PROJECT_NAME) => {
                warn!(workspace_id = %workspace.id, "Default project created concurrently, re-reading");
                return self
                    .store
                    .first_project_in_workspace(workspace.id)
                    .await?
                    .ok_or_else(|| ServiceError::conflict("Default project could not be resolved"));
            }
            Err(e) => return Err(e.into()),
        };

        self.store
            .create_sections(project.id, numbered_sections(&BOOTSTRAP_SECTIONS, 0))
            .await?;

        info!(workspace_id = %workspace.id, project_id = %project.id, "Provisioned default project");
        Ok(project)
    }

    pub async fn next_section_order(&self, project_id: Uuid) -> StoreResult<i32> {
        Ok(next_after(self.store.max_section_order(project_id).await?))
    }

    /// Scoped to the exact (project, section) pair; `None` is the backlog
    pub async fn next_task_order(&self, project_id: Uuid, section_id: Option<Uuid>) -> StoreResult<i32> {
        Ok(next_after(self.store.max_task_order(project_id, section_id).await?))
    }

    pub async fn next_subtask_order(&self, task_id: Uuid) -> StoreResult<i32> {
        Ok(next_after(self.store.max_subtask_order(task_id).await?))
    }
}
