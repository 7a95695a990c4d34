/// Membership resolver
///
/// Requests name their target by entity id, but roles are granted per
/// workspace. The resolver walks task → project → workspace (or section →
/// project → workspace) and then looks up the caller's membership row.
///
/// # Example
///
/// ```
/// use tasklane_shared::access::membership::{EntityRef, MembershipResolver};
/// use tasklane_shared::store::MemoryStore;
/// use uuid::Uuid;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), tasklane_shared::store::StoreError> {
/// let store = MemoryStore::new();
/// let resolver = MembershipResolver::new(&store);
///
/// // Unknown entity: no workspace, no role
/// let role = resolver.role_for_entity(Uuid::new_v4(), EntityRef::Task(Uuid::new_v4())).await?;
/// assert!(role.is_none());
/// # Ok(())
/// # }
/// ```

use uuid::Uuid;

use crate::models::workspace_member::WorkspaceRole;
use crate::store::{Store, StoreResult};

/// An entity that resolves to exactly one workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Workspace(Uuid),
    Project(Uuid),
    Section(Uuid),
    Task(Uuid),
}

impl EntityRef {
    pub fn id(&self) -> Uuid {
        match *self {
            EntityRef::Workspace(id)
            | EntityRef::Project(id)
            | EntityRef::Section(id)
            | EntityRef::Task(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EntityRef::Workspace(_) => "workspace",
            EntityRef::Project(_) => "project",
            EntityRef::Section(_) => "section",
            EntityRef::Task(_) => "task",
        }
    }
}

pub struct MembershipResolver<'a> {
    store: &'a dyn Store,
}

impl<'a> MembershipResolver<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        MembershipResolver { store }
    }

    /// Single lookup by (workspace, user)
    pub async fn role_of(&self, user_id: Uuid, workspace_id: Uuid) -> StoreResult<Option<WorkspaceRole>> {
        self.store.find_role(workspace_id, user_id).await
    }

    /// Owning workspace of `entity`, or `None` if the entity does not exist.
    ///
    /// A workspace reference is returned as-is without an existence check;
    /// membership lookup alone decides access to it.
    pub async fn workspace_of(&self, entity: EntityRef) -> StoreResult<Option<Uuid>> {
        let project_id = match entity {
            EntityRef::Workspace(id) => return Ok(Some(id)),
            EntityRef::Project(id) => id,
            EntityRef::Section(id) => match self.store.find_section(id).await? {
                Some(section) => section.project_id,
                None => return Ok(None),
            },
            EntityRef::Task(id) => match self.store.find_task(id).await? {
                Some(task) => task.project_id,
                None => return Ok(None),
            },
        };

        Ok(self
            .store
            .find_project(project_id)
            .await?
            .map(|project| project.workspace_id))
    }

    /// The caller's role in the workspace that owns `entity`
    pub async fn role_for_entity(&self, user_id: Uuid, entity: EntityRef) -> StoreResult<Option<WorkspaceRole>> {
        match self.workspace_of(entity).await? {
            Some(workspace_id) => self.role_of(user_id, workspace_id).await,
            None => Ok(None),
        }
    }
}
