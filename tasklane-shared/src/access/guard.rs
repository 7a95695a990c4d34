/// Authorization guard: the single policy decision point
///
/// Every mutator and every read of a scoped entity calls
/// [`AuthorizationGuard::authorize`] (or [`AuthorizationGuard::require`])
/// before touching storage.
///
/// # Policy
///
/// | Action                                  | Rule                                  |
/// |-----------------------------------------|---------------------------------------|
/// | view workspace / project                | any role                              |
/// | create task                             | any role in the project's workspace   |
/// | create / update project, create section | ADMIN or MEMBER                       |
/// | delete project                          | ADMIN, and the project has no tasks   |
/// | manage members                          | ADMIN                                 |
/// | view / update task                      | task owner or assignee                |
/// | delete task                             | task owner                            |
///
/// No membership row means no access.
///
/// # Existence hiding
///
/// A denial carries a precise [`Denial`] reason for logs and tests, but
/// [`Denial::kind`] collapses it for callers: entity-scoped denials are
/// reported as not-found so inaccessible entities are indistinguishable from
/// missing ones. Only collection-level actions (creating a project in a
/// workspace, managing a workspace's members) report forbidden.
///
/// # Example
///
/// ```
/// use tasklane_shared::access::guard::{Action, AuthorizationGuard, Decision, Denial};
/// use tasklane_shared::access::membership::EntityRef;
/// use tasklane_shared::store::MemoryStore;
/// use uuid::Uuid;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), tasklane_shared::store::StoreError> {
/// let store = MemoryStore::new();
/// let guard = AuthorizationGuard::new(&store);
///
/// let decision = guard
///     .authorize(Uuid::new_v4(), Action::CreateProject, EntityRef::Workspace(Uuid::new_v4()))
///     .await?;
/// assert_eq!(decision, Decision::Deny(Denial::NotMember));
/// # Ok(())
/// # }
/// ```

use tracing::debug;
use uuid::Uuid;

use super::membership::{EntityRef, MembershipResolver};
use crate::error::ServiceError;
use crate::models::workspace_member::WorkspaceRole;
use crate::store::{Store, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ViewWorkspace,
    ManageMembers,
    CreateProject,
    ViewProject,
    UpdateProject,
    DeleteProject,
    CreateSection,
    CreateTask,
    ViewTask,
    UpdateTask,
    DeleteTask,
}

/// Minimum workspace role for a role-gated action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRequirement {
    AnyRole,
    /// ADMIN or MEMBER
    Editor,
    Admin,
}

impl RoleRequirement {
    pub fn admits(&self, role: WorkspaceRole) -> bool {
        match self {
            RoleRequirement::AnyRole => true,
            RoleRequirement::Editor => role.can_edit(),
            RoleRequirement::Admin => role.is_admin(),
        }
    }
}

/// Task actions are gated by the task's people, not by workspace role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRule {
    OwnerOrAssignee,
    Owner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Role(RoleRequirement),
    Task(TaskRule),
}

impl Action {
    pub fn policy(&self) -> Policy {
        use Action::*;
        match self {
            ViewWorkspace | ViewProject | CreateTask => {
                Policy::Role(RoleRequirement::AnyRole)
            }
            CreateProject | UpdateProject | CreateSection => Policy::Role(RoleRequirement::Editor),
            DeleteProject | ManageMembers => Policy::Role(RoleRequirement::Admin),
            ViewTask | UpdateTask => Policy::Task(TaskRule::OwnerOrAssignee),
            DeleteTask => Policy::Task(TaskRule::Owner),
        }
    }

    /// Actions on a workspace's collections rather than on one entity
    pub fn is_collection_level(&self) -> bool {
        matches!(self, Action::CreateProject | Action::ManageMembers)
    }
}

/// Why a request was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The target entity does not exist
    NotFound,
    /// No membership in the owning workspace
    NotMember,
    InsufficientRole {
        required: RoleRequirement,
        actual: WorkspaceRole,
    },
    NotOwner,
    NotOwnerOrAssignee,
    /// Project deletion blocked by remaining tasks
    HasTasks(i64),
}

/// What a caller sees of a denial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialKind {
    NotFound,
    Forbidden,
    Conflict,
}

impl Denial {
    pub fn kind(&self, action: Action) -> DenialKind {
        match self {
            Denial::HasTasks(_) => DenialKind::Conflict,
            Denial::NotMember | Denial::InsufficientRole { .. } if action.is_collection_level() => {
                DenialKind::Forbidden
            }
            _ => DenialKind::NotFound,
        }
    }
}

/// Context established by a successful check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub workspace_id: Uuid,
    /// `None` when a task is reached through ownership alone
    pub role: Option<WorkspaceRole>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow(Grant),
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}

pub struct AuthorizationGuard<'a> {
    store: &'a dyn Store,
    resolver: MembershipResolver<'a>,
}

impl<'a> AuthorizationGuard<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        AuthorizationGuard {
            store,
            resolver: MembershipResolver::new(store),
        }
    }

    /// Can `user_id` perform `action` on `entity`?
    pub async fn authorize(
        &self,
        user_id: Uuid,
        action: Action,
        entity: EntityRef,
    ) -> StoreResult<Decision> {
        let decision = match action.policy() {
            Policy::Role(required) => self.check_role(user_id, action, required, entity).await?,
            Policy::Task(rule) => self.check_task(user_id, rule, entity).await?,
        };

        if let Decision::Deny(denial) = decision {
            debug!(
                user_id = %user_id,
                action = ?action,
                entity = entity.kind(),
                entity_id = %entity.id(),
                denial = ?denial,
                "Access denied"
            );
        }

        Ok(decision)
    }

    /// [`authorize`](Self::authorize), turning a denial into
    /// [`ServiceError::Denied`]
    pub async fn require(
        &self,
        user_id: Uuid,
        action: Action,
        entity: EntityRef,
    ) -> Result<Grant, ServiceError> {
        match self.authorize(user_id, action, entity).await? {
            Decision::Allow(grant) => Ok(grant),
            Decision::Deny(denial) => Err(ServiceError::Denied {
                action,
                entity,
                denial,
            }),
        }
    }

    async fn check_role(
        &self,
        user_id: Uuid,
        action: Action,
        required: RoleRequirement,
        entity: EntityRef,
    ) -> StoreResult<Decision> {
        let Some(workspace_id) = self.resolver.workspace_of(entity).await? else {
            return Ok(Decision::Deny(Denial::NotFound));
        };
        let Some(role) = self.resolver.role_of(user_id, workspace_id).await? else {
            return Ok(Decision::Deny(Denial::NotMember));
        };
        if !required.admits(role) {
            return Ok(Decision::Deny(Denial::InsufficientRole {
                required,
                actual: role,
            }));
        }

        if let (Action::DeleteProject, EntityRef::Project(project_id)) = (action, entity) {
            let counts = self.store.project_counts(project_id).await?;
            if counts.tasks > 0 {
                return Ok(Decision::Deny(Denial::HasTasks(counts.tasks)));
            }
        }

        Ok(Decision::Allow(Grant {
            workspace_id,
            role: Some(role),
        }))
    }

    async fn check_task(&self, user_id: Uuid, rule: TaskRule, entity: EntityRef) -> StoreResult<Decision> {
        let EntityRef::Task(task_id) = entity else {
            return Ok(Decision::Deny(Denial::NotFound));
        };
        let Some(task) = self.store.find_task(task_id).await? else {
            return Ok(Decision::Deny(Denial::NotFound));
        };

        match rule {
            TaskRule::Owner if task.owner_id != user_id => {
                return Ok(Decision::Deny(Denial::NotOwner));
            }
            TaskRule::OwnerOrAssignee if !task.involves(user_id) => {
                return Ok(Decision::Deny(Denial::NotOwnerOrAssignee));
            }
            _ => {}
        }

        let Some(workspace_id) = self.resolver.workspace_of(EntityRef::Project(task.project_id)).await?
        else {
            return Ok(Decision::Deny(Denial::NotFound));
        };
        let role = self.resolver.role_of(user_id, workspace_id).await?;

        Ok(Decision::Allow(Grant { workspace_id, role }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirements() {
        assert!(RoleRequirement::AnyRole.admits(WorkspaceRole::Viewer));
        assert!(RoleRequirement::Editor.admits(WorkspaceRole::Member));
        assert!(!RoleRequirement::Editor.admits(WorkspaceRole::Viewer));
        assert!(RoleRequirement::Admin.admits(WorkspaceRole::Admin));
        assert!(!RoleRequirement::Admin.admits(WorkspaceRole::Member));
    }

    #[test]
    fn test_policy_table() {
        assert_eq!(Action::CreateTask.policy(), Policy::Role(RoleRequirement::AnyRole));
        assert_eq!(Action::CreateSection.policy(), Policy::Role(RoleRequirement::Editor));
        assert_eq!(Action::DeleteProject.policy(), Policy::Role(RoleRequirement::Admin));
        assert_eq!(Action::UpdateTask.policy(), Policy::Task(TaskRule::OwnerOrAssignee));
        assert_eq!(Action::DeleteTask.policy(), Policy::Task(TaskRule::Owner));
    }

    #[test]
    fn test_existence_hiding() {
        let viewer_denied = Denial::InsufficientRole {
            required: RoleRequirement::Editor,
            actual: WorkspaceRole::Viewer,
        };

        assert_eq!(Denial::NotMember.kind(Action::ViewProject), DenialKind::NotFound);
        assert_eq!(viewer_denied.kind(Action::UpdateProject), DenialKind::NotFound);
        assert_eq!(Denial::NotOwner.kind(Action::DeleteTask), DenialKind::NotFound);

        assert_eq!(Denial::NotMember.kind(Action::CreateProject), DenialKind::Forbidden);
        assert_eq!(viewer_denied.kind(Action::CreateProject), DenialKind::Forbidden);
        assert_eq!(Denial::NotFound.kind(Action::CreateProject), DenialKind::NotFound);

        assert_eq!(Denial::HasTasks(2).kind(Action::DeleteProject), DenialKind::Conflict);
    }
}
