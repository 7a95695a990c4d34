/// Workspace creation and membership management

use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::views::{MemberView, ViewAssembler};
use super::{non_blank, required};
use crate::access::guard::{Action, AuthorizationGuard};
use crate::access::membership::EntityRef;
use crate::auth::credentials::normalize_email;
use crate::error::{ServiceError, ServiceResult};
use crate::models::workspace::{slugify, CreateWorkspace, Workspace, WorkspaceMembership};
use crate::models::workspace_member::{CreateWorkspaceMember, WorkspaceRole};
use crate::store::{constraints, Store};

const SLUG_SUFFIX_LEN: usize = 6;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkspace {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    pub email: Option<String>,
    /// Defaults to MEMBER
    pub role: Option<WorkspaceRole>,
}

/// `slugify(name)` plus a short random suffix, so two workspaces with the
/// same name still get distinct slugs
fn generated_slug(name: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SLUG_SUFFIX_LEN)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();

    match slugify(name) {
        base if base.is_empty() => format!("workspace-{}", suffix),
        base => format!("{}-{}", base, suffix),
    }
}

/// The caller's workspaces with their role in each, oldest membership first
pub async fn list_workspaces(store: &dyn Store, user_id: Uuid) -> ServiceResult<Vec<WorkspaceMembership>> {
    Ok(store.list_workspaces_for_user(user_id).await?)
}

/// Creates a workspace with the caller as its ADMIN
pub async fn create_workspace(store: &dyn Store, user_id: Uuid, input: NewWorkspace) -> ServiceResult<Workspace> {
    let name = required(input.name, "Workspace name is required")?;
    let slug = match non_blank(input.slug) {
        Some(slug) => {
            let slug = slugify(&slug);
            if slug.is_empty() {
                return Err(ServiceError::validation(
                    "Workspace slug must contain letters or digits",
                ));
            }
            slug
        }
        None => generated_slug(&name),
    };

    let workspace = store
        .create_workspace(CreateWorkspace {
            name,
            slug,
            description: non_blank(input.description),
            creator_id: user_id,
        })
        .await
        .map_err(|e| {
            if e.is_conflict_on(constraints::WORKSPACE_SLUG) {
                ServiceError::conflict("A workspace with this slug already exists")
            } else {
                e.into()
            }
        })?;

    info!(user_id = %user_id, workspace_id = %workspace.id, slug = %workspace.slug, "Workspace created");
    Ok(workspace)
}

pub async fn list_members(store: &dyn Store, user_id: Uuid, workspace_id: Uuid) -> ServiceResult<Vec<MemberView>> {
    AuthorizationGuard::new(store)
        .require(user_id, Action::ViewWorkspace, EntityRef::Workspace(workspace_id))
        .await?;

    let assembler = ViewAssembler::new(store);
    let mut members = Vec::new();
    for member in store.list_members(workspace_id).await? {
        members.push(assembler.member_view(member).await?);
    }
    Ok(members)
}

/// Adds an existing user to the workspace; ADMIN only
pub async fn add_member(
    store: &dyn Store,
    user_id: Uuid,
    workspace_id: Uuid,
    input: NewMember,
) -> ServiceResult<MemberView> {
    let email = required(input.email, "Email is required")?;

    AuthorizationGuard::new(store)
        .require(user_id, Action::ManageMembers, EntityRef::Workspace(workspace_id))
        .await?;

    let Some(user) = store.find_user_by_email(&normalize_email(&email)).await? else {
        return Err(ServiceError::NotFound("User"));
    };

    let role = input.role.unwrap_or(WorkspaceRole::Member);
    let member = store
        .add_member(CreateWorkspaceMember {
            workspace_id,
            user_id: user.id,
            role,
        })
        .await
        .map_err(|e| {
            if e.is_conflict_on(constraints::WORKSPACE_MEMBER) {
                ServiceError::conflict("User is already a member of this workspace")
            } else {
                e.into()
            }
        })?;

    info!(
        workspace_id = %workspace_id,
        member_id = %user.id,
        role = %role,
        added_by = %user_id,
        "Workspace member added"
    );
    Ok(ViewAssembler::new(store).member_view(member).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::guard::DenialKind;
    use crate::models::user::CreateUser;
    use crate::store::MemoryStore;

    async fn user(store: &MemoryStore, email: &str) -> Uuid {
        store
            .create_user(CreateUser {
                email: email.to_string(),
                password_hash: "x".to_string(),
                name: None,
            })
            .await
            .unwrap()
            .id
    }

    fn named(name: &str) -> NewWorkspace {
        NewWorkspace {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_generated_slug() {
        let slug = generated_slug("Design Team");
        assert!(slug.starts_with("design-team-"));
        assert_eq!(slug.len(), "design-team-".len() + SLUG_SUFFIX_LEN);
        assert!(generated_slug("!!!").starts_with("workspace-"));
    }

    #[tokio::test]
    async fn test_create_makes_caller_admin() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com").await;

        let workspace = create_workspace(&store, alice, named("Design")).await.unwrap();
        let listed = list_workspaces(&store, alice).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].workspace.id, workspace.id);
        assert_eq!(listed[0].role, WorkspaceRole::Admin);
    }

    #[tokio::test]
    async fn test_explicit_slug_conflict() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com").await;
        let input = NewWorkspace {
            name: Some("Design".to_string()),
            slug: Some("design".to_string()),
            description: None,
        };

        create_workspace(&store, alice, input.clone()).await.unwrap();
        let err = create_workspace(&store, alice, input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_add_member_rules() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com").await;
        let bob = user(&store, "bob@example.com").await;
        let workspace = create_workspace(&store, alice, named("Design")).await.unwrap();

        let added = add_member(
            &store,
            alice,
            workspace.id,
            NewMember {
                email: Some(" Bob@Example.com ".to_string()),
                role: Some(WorkspaceRole::Viewer),
            },
        )
        .await
        .unwrap();
        assert_eq!(added.member.user_id, bob);
        assert_eq!(added.member.role, WorkspaceRole::Viewer);

        let again = add_member(
            &store,
            alice,
            workspace.id,
            NewMember {
                email: Some("bob@example.com".to_string()),
                role: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(again, ServiceError::Conflict { .. }));

        // A viewer cannot manage members
        let denied = add_member(
            &store,
            bob,
            workspace.id,
            NewMember {
                email: Some("alice@example.com".to_string()),
                role: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(denied.denial_kind(), Some(DenialKind::Forbidden));

        let unknown = add_member(
            &store,
            alice,
            workspace.id,
            NewMember {
                email: Some("nobody@example.com".to_string()),
                role: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(unknown, ServiceError::NotFound("User")));

        assert_eq!(list_members(&store, bob, workspace.id).await.unwrap().len(), 2);
    }
}
