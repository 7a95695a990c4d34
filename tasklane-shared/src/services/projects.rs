/// Project operations
///
/// Projects are listed across every workspace the caller belongs to and
/// are otherwise reached by id, with the caller's role in the owning
/// workspace deciding what they may do.
///
/// # Example
///
/// ```
/// use tasklane_shared::services::{projects, workspaces};
/// use tasklane_shared::models::user::CreateUser;
/// use tasklane_shared::store::{MemoryStore, Store};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), tasklane_shared::error::ServiceError> {
/// let store = MemoryStore::new();
/// let user = store.create_user(CreateUser {
///     email: "pm@example.com".into(),
///     password_hash: "x".into(),
///     name: None,
/// }).await?;
/// let workspace = workspaces::create_workspace(&store, user.id, workspaces::NewWorkspace {
///     name: Some("Acme".into()),
///     ..Default::default()
/// }).await?;
///
/// let created = projects::create_project(&store, user.id, projects::NewProject {
///     name: Some("Launch".into()),
///     workspace_id: Some(workspace.id),
///     create_default_sections: true,
///     ..Default::default()
/// }).await?;
/// assert_eq!(created.counts.sections, 4);
/// # Ok(())
/// # }
/// ```

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::views::{ProjectDetail, ProjectListItem, ViewAssembler, WorkspaceSummary};
use super::{double_option, non_blank};
use crate::access::guard::{Action, AuthorizationGuard};
use crate::access::membership::EntityRef;
use crate::error::{ServiceError, ServiceResult};
use crate::hierarchy::{numbered_sections, CANONICAL_SECTIONS};
use crate::models::project::{CreateProject, Project, UpdateProject, DEFAULT_PROJECT_COLOR};
use crate::models::task::TaskFilter;
use crate::models::workspace_member::WorkspaceRole;
use crate::store::{constraints, Store, StoreError};

const DUPLICATE_NAME: &str = "A project with this name already exists in the workspace";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: Option<String>,
    pub workspace_id: Option<Uuid>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    /// Adds To Do, In Progress, Review and Done
    #[serde(default)]
    pub create_default_sections: bool,
}

/// Absent fields are left alone. An empty name or color is ignored;
/// `null` clears description and icon.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub color: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub icon: Option<Option<String>>,
}

impl From<ProjectPatch> for UpdateProject {
    fn from(patch: ProjectPatch) -> Self {
        UpdateProject {
            name: non_blank(patch.name),
            description: patch.description,
            color: non_blank(patch.color),
            icon: patch.icon,
        }
    }
}

fn map_duplicate_name(err: StoreError) -> ServiceError {
    if err.is_conflict_on(constraints::PROJECT_NAME) {
        ServiceError::conflict(DUPLICATE_NAME)
    } else {
        err.into()
    }
}

async fn list_item(store: &dyn Store, project: Project, role: WorkspaceRole) -> ServiceResult<ProjectListItem> {
    let workspace_name = store
        .find_workspace(project.workspace_id)
        .await?
        .map(|w| w.name)
        .unwrap_or_default();
    let counts = store.project_counts(project.id).await?;
    Ok(ProjectListItem {
        project,
        workspace_name,
        member_role: role,
        counts,
    })
}

/// Every project in every workspace the caller belongs to, newest first
/// within each workspace
pub async fn list_projects(store: &dyn Store, user_id: Uuid) -> ServiceResult<Vec<ProjectListItem>> {
    let mut items = Vec::new();
    for membership in store.list_workspaces_for_user(user_id).await? {
        for project in store.list_projects(membership.workspace.id).await? {
            let counts = store.project_counts(project.id).await?;
            items.push(ProjectListItem {
                project,
                workspace_name: membership.workspace.name.clone(),
                member_role: membership.role,
                counts,
            });
        }
    }
    Ok(items)
}

pub async fn create_project(store: &dyn Store, user_id: Uuid, input: NewProject) -> ServiceResult<ProjectListItem> {
    let (Some(name), Some(workspace_id)) = (non_blank(input.name), input.workspace_id) else {
        return Err(ServiceError::validation(
            "Project name and workspace ID are required",
        ));
    };

    let grant = AuthorizationGuard::new(store)
        .require(user_id, Action::CreateProject, EntityRef::Workspace(workspace_id))
        .await?;

    let project = store
        .create_project(CreateProject {
            workspace_id,
            name,
            description: non_blank(input.description),
            color: non_blank(input.color).unwrap_or_else(|| DEFAULT_PROJECT_COLOR.to_string()),
            icon: non_blank(input.icon),
        })
        .await
        .map_err(map_duplicate_name)?;

    if input.create_default_sections {
        store
            .create_sections(project.id, numbered_sections(&CANONICAL_SECTIONS, 1))
            .await?;
    }

    info!(
        user_id = %user_id,
        workspace_id = %workspace_id,
        project_id = %project.id,
        default_sections = input.create_default_sections,
        "Project created"
    );
    list_item(store, project, grant.role.unwrap_or(WorkspaceRole::Viewer)).await
}

/// The project with its workspace, ordered sections, unsectioned tasks and
/// the caller's role
pub async fn get_project(store: &dyn Store, user_id: Uuid, project_id: Uuid) -> ServiceResult<ProjectDetail> {
    let grant = AuthorizationGuard::new(store)
        .require(user_id, Action::ViewProject, EntityRef::Project(project_id))
        .await?;

    let (Some(project), Some(workspace)) = (
        store.find_project(project_id).await?,
        store.find_workspace(grant.workspace_id).await?,
    ) else {
        return Err(ServiceError::NotFound("Project"));
    };

    let assembler = ViewAssembler::new(store);
    let mut sections = Vec::new();
    for section in store.list_sections(project_id).await? {
        sections.push(assembler.section_view(section).await?);
    }
    let backlog = store
        .list_tasks(&TaskFilter::in_section(project_id, None))
        .await?;
    let tasks = assembler.task_briefs(backlog).await?;
    let counts = store.project_counts(project_id).await?;

    Ok(ProjectDetail {
        project,
        workspace: WorkspaceSummary::from(&workspace),
        sections,
        tasks,
        member_role: grant.role.unwrap_or(WorkspaceRole::Viewer),
        counts,
    })
}

pub async fn update_project(
    store: &dyn Store,
    user_id: Uuid,
    project_id: Uuid,
    patch: ProjectPatch,
) -> ServiceResult<ProjectListItem> {
    let grant = AuthorizationGuard::new(store)
        .require(user_id, Action::UpdateProject, EntityRef::Project(project_id))
        .await?;

    let update = UpdateProject::from(patch);
    let updated = if update.is_empty() {
        store.find_project(project_id).await?
    } else {
        store
            .update_project(project_id, update)
            .await
            .map_err(map_duplicate_name)?
    };
    let project = updated.ok_or(ServiceError::NotFound("Project"))?;

    info!(user_id = %user_id, project_id = %project_id, "Project updated");
    list_item(store, project, grant.role.unwrap_or(WorkspaceRole::Viewer)).await
}

/// ADMIN only, and only once the project has no tasks left. Sections go
/// with it.
pub async fn delete_project(store: &dyn Store, user_id: Uuid, project_id: Uuid) -> ServiceResult<()> {
    AuthorizationGuard::new(store)
        .require(user_id, Action::DeleteProject, EntityRef::Project(project_id))
        .await?;

    match store.delete_project(project_id).await {
        Ok(true) => {
            info!(user_id = %user_id, project_id = %project_id, "Project deleted");
            Ok(())
        }
        Ok(false) => Err(ServiceError::NotFound("Project")),
        // A task was added between the check and the delete
        Err(StoreError::InvalidReference(_)) => {
            let tasks = store.project_counts(project_id).await?.tasks;
            Err(ServiceError::Conflict {
                message: "Cannot delete project with existing tasks".to_string(),
                details: Some(has_tasks_details(tasks)),
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Explanation attached to a delete blocked by remaining tasks
pub fn has_tasks_details(tasks: i64) -> String {
    format!(
        "This project contains {} task(s). Please move or delete all tasks before deleting the project.",
        tasks
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::guard::{Denial, DenialKind};
    use crate::models::user::CreateUser;
    use crate::services::workspaces::{create_workspace, NewWorkspace};
    use crate::store::MemoryStore;

    async fn setup() -> (MemoryStore, Uuid, Uuid) {
        let store = MemoryStore::new();
        let user = store
            .create_user(CreateUser {
                email: "pm@example.com".to_string(),
                password_hash: "x".to_string(),
                name: None,
            })
            .await
            .unwrap();
        let workspace = create_workspace(
            &store,
            user.id,
            NewWorkspace {
                name: Some("Acme".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (store, user.id, workspace.id)
    }

    fn new_project(name: &str, workspace_id: Uuid) -> NewProject {
        NewProject {
            name: Some(name.to_string()),
            workspace_id: Some(workspace_id),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_defaults() {
        let (store, user, workspace) = setup().await;

        let created = create_project(&store, user, new_project("Launch", workspace))
            .await
            .unwrap();
        assert_eq!(created.project.color, DEFAULT_PROJECT_COLOR);
        assert_eq!(created.workspace_name, "Acme");
        assert_eq!(created.member_role, WorkspaceRole::Admin);
        assert_eq!(created.counts.sections, 0);
    }

    #[tokio::test]
    async fn test_create_with_default_sections() {
        let (store, user, workspace) = setup().await;
        let mut input = new_project("Launch", workspace);
        input.create_default_sections = true;

        let created = create_project(&store, user, input).await.unwrap();
        let sections = store.list_sections(created.project.id).await.unwrap();
        let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
        let orders: Vec<i32> = sections.iter().map(|s| s.order).collect();

        assert_eq!(names, vec!["To Do", "In Progress", "Review", "Done"]);
        assert_eq!(orders, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_create_requires_fields_and_unique_name() {
        let (store, user, workspace) = setup().await;

        let missing = create_project(
            &store,
            user,
            NewProject {
                name: Some("  ".to_string()),
                workspace_id: Some(workspace),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(missing, ServiceError::Validation(_)));

        create_project(&store, user, new_project("Launch", workspace))
            .await
            .unwrap();
        let duplicate = create_project(&store, user, new_project("Launch", workspace))
            .await
            .unwrap_err();
        assert!(matches!(duplicate, ServiceError::Conflict { ref message, .. } if message == DUPLICATE_NAME));
    }

    #[tokio::test]
    async fn test_patch_semantics() {
        let (store, user, workspace) = setup().await;
        let mut input = new_project("Launch", workspace);
        input.description = Some("Q3 launch".to_string());
        input.icon = Some("rocket".to_string());
        let created = create_project(&store, user, input).await.unwrap();

        let patch: ProjectPatch =
            serde_json::from_str(r#"{"name": "", "color": "", "description": null}"#).unwrap();
        let updated = update_project(&store, user, created.project.id, patch)
            .await
            .unwrap();

        assert_eq!(updated.project.name, "Launch");
        assert_eq!(updated.project.color, DEFAULT_PROJECT_COLOR);
        assert_eq!(updated.project.description, None);
        assert_eq!(updated.project.icon.as_deref(), Some("rocket"));
    }

    #[tokio::test]
    async fn test_get_project_detail() {
        let (store, user, workspace) = setup().await;
        let mut input = new_project("Launch", workspace);
        input.create_default_sections = true;
        let created = create_project(&store, user, input).await.unwrap();

        let detail = get_project(&store, user, created.project.id).await.unwrap();
        assert_eq!(detail.workspace.id, workspace);
        assert_eq!(detail.sections.len(), 4);
        assert!(detail.tasks.is_empty());
        assert_eq!(detail.member_role, WorkspaceRole::Admin);

        let stranger = Uuid::new_v4();
        let hidden = get_project(&store, stranger, created.project.id)
            .await
            .unwrap_err();
        assert_eq!(hidden.denial_kind(), Some(DenialKind::NotFound));
    }

    #[tokio::test]
    async fn test_delete_empty_project() {
        let (store, user, workspace) = setup().await;
        let created = create_project(&store, user, new_project("Launch", workspace))
            .await
            .unwrap();

        delete_project(&store, user, created.project.id).await.unwrap();

        let gone = get_project(&store, user, created.project.id).await.unwrap_err();
        assert!(matches!(
            gone,
            ServiceError::Denied {
                denial: Denial::NotFound,
                ..
            }
        ));
    }

    #[test]
    fn test_has_tasks_details() {
        assert!(has_tasks_details(3).starts_with("This project contains 3 task(s)."));
    }
}
