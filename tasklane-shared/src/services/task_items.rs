/// Subtasks, comments, attachments and tags
///
/// Children follow their task's access rule: whoever may see a task may read
/// its children, and whoever may update it may add, change or remove them.
/// Attachments are metadata only; storing the file is the client's job.

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::required;
use super::views::{CommentView, ViewAssembler};
use crate::access::guard::{Action, AuthorizationGuard};
use crate::access::membership::EntityRef;
use crate::error::{ServiceError, ServiceResult};
use crate::hierarchy::HierarchyManager;
use crate::models::attachment::{Attachment, CreateAttachment};
use crate::models::comment::CreateComment;
use crate::models::subtask::{CreateSubtask, Subtask, UpdateSubtask};
use crate::models::tag::{Tag, DEFAULT_TAG_COLOR};
use crate::store::Store;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskInput {
    pub title: Option<String>,
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentInput {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInput {
    pub name: Option<String>,
    pub url: Option<String>,
    pub size: Option<i64>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagInput {
    pub name: Option<String>,
    pub color: Option<String>,
}

async fn require_task(store: &dyn Store, user_id: Uuid, action: Action, task_id: Uuid) -> ServiceResult<()> {
    AuthorizationGuard::new(store)
        .require(user_id, action, EntityRef::Task(task_id))
        .await?;
    Ok(())
}

// Subtasks

pub async fn list_subtasks(store: &dyn Store, user_id: Uuid, task_id: Uuid) -> ServiceResult<Vec<Subtask>> {
    require_task(store, user_id, Action::ViewTask, task_id).await?;
    Ok(store.list_subtasks(task_id).await?)
}

pub async fn create_subtask(store: &dyn Store, user_id: Uuid, task_id: Uuid, input: SubtaskInput) -> ServiceResult<Subtask> {
    let title = required(input.title, "Subtask title is required")?;
    require_task(store, user_id, Action::UpdateTask, task_id).await?;

    let order = match input.order {
        Some(order) => order,
        None => HierarchyManager::new(store).next_subtask_order(task_id).await?,
    };
    let subtask = store
        .create_subtask(CreateSubtask {
            task_id,
            title,
            order,
        })
        .await?;

    info!(user_id = %user_id, task_id = %task_id, subtask_id = %subtask.id, "Subtask created");
    Ok(subtask)
}

pub async fn update_subtask(
    store: &dyn Store,
    user_id: Uuid,
    task_id: Uuid,
    subtask_id: Uuid,
    patch: SubtaskPatch,
) -> ServiceResult<Subtask> {
    let title = match patch.title {
        Some(title) => Some(required(Some(title), "Subtask title cannot be empty")?),
        None => None,
    };
    require_task(store, user_id, Action::UpdateTask, task_id).await?;

    store
        .update_subtask(
            task_id,
            subtask_id,
            UpdateSubtask {
                title,
                completed: patch.completed,
                order: patch.order,
            },
        )
        .await?
        .ok_or(ServiceError::NotFound("Subtask"))
}

pub async fn delete_subtask(store: &dyn Store, user_id: Uuid, task_id: Uuid, subtask_id: Uuid) -> ServiceResult<()> {
    require_task(store, user_id, Action::UpdateTask, task_id).await?;

    if !store.delete_subtask(task_id, subtask_id).await? {
        return Err(ServiceError::NotFound("Subtask"));
    }
    Ok(())
}

// Comments

/// Newest first
pub async fn list_comments(store: &dyn Store, user_id: Uuid, task_id: Uuid) -> ServiceResult<Vec<CommentView>> {
    require_task(store, user_id, Action::ViewTask, task_id).await?;

    let assembler = ViewAssembler::new(store);
    let mut views = Vec::new();
    for comment in store.list_comments(task_id, None).await? {
        views.push(assembler.comment_view(comment).await?);
    }
    Ok(views)
}

pub async fn add_comment(store: &dyn Store, user_id: Uuid, task_id: Uuid, input: CommentInput) -> ServiceResult<CommentView> {
    let content = required(input.content, "Comment content is required")?;
    require_task(store, user_id, Action::UpdateTask, task_id).await?;

    let comment = store
        .create_comment(CreateComment {
            task_id,
            user_id,
            content,
        })
        .await?;

    info!(user_id = %user_id, task_id = %task_id, comment_id = %comment.id, "Comment added");
    Ok(ViewAssembler::new(store).comment_view(comment).await?)
}

// Attachments

pub async fn list_attachments(store: &dyn Store, user_id: Uuid, task_id: Uuid) -> ServiceResult<Vec<Attachment>> {
    require_task(store, user_id, Action::ViewTask, task_id).await?;
    Ok(store.list_attachments(task_id).await?)
}

pub async fn add_attachment(
    store: &dyn Store,
    user_id: Uuid,
    task_id: Uuid,
    input: AttachmentInput,
) -> ServiceResult<Attachment> {
    let name = required(input.name, "Attachment name is required")?;
    let url = required(input.url, "Attachment URL is required")?;
    let mime_type = required(input.mime_type, "Attachment MIME type is required")?;
    let size = match input.size {
        Some(size) if size >= 0 => size,
        _ => return Err(ServiceError::validation("Attachment size must be a non-negative integer")),
    };
    require_task(store, user_id, Action::UpdateTask, task_id).await?;

    let attachment = store
        .create_attachment(CreateAttachment {
            task_id,
            name,
            url,
            size,
            mime_type,
        })
        .await?;

    info!(user_id = %user_id, task_id = %task_id, attachment_id = %attachment.id, "Attachment added");
    Ok(attachment)
}

pub async fn delete_attachment(store: &dyn Store, user_id: Uuid, task_id: Uuid, attachment_id: Uuid) -> ServiceResult<()> {
    require_task(store, user_id, Action::UpdateTask, task_id).await?;

    if !store.delete_attachment(task_id, attachment_id).await? {
        return Err(ServiceError::NotFound("Attachment"));
    }
    Ok(())
}

// Tags

/// Finds or creates the tag by name and links it to the task
pub async fn add_tag(store: &dyn Store, user_id: Uuid, task_id: Uuid, input: TagInput) -> ServiceResult<Tag> {
    let name = required(input.name, "Tag name is required")?;
    require_task(store, user_id, Action::UpdateTask, task_id).await?;

    let color = super::non_blank(input.color).unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string());
    let tag = store.upsert_tag(&name, &color).await?;
    store.attach_tag(task_id, tag.id).await?;

    info!(user_id = %user_id, task_id = %task_id, tag = %tag.name, "Tag attached");
    Ok(tag)
}

pub async fn remove_tag(store: &dyn Store, user_id: Uuid, task_id: Uuid, tag_id: Uuid) -> ServiceResult<()> {
    require_task(store, user_id, Action::UpdateTask, task_id).await?;

    if !store.detach_tag(task_id, tag_id).await? {
        return Err(ServiceError::NotFound("Tag"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::guard::DenialKind;
    use crate::models::user::CreateUser;
    use crate::services::tasks::{create_task, delete_task, NewTask};
    use crate::store::MemoryStore;

    async fn user(store: &MemoryStore, email: &str) -> Uuid {
        store
            .create_user(CreateUser {
                email: email.to_string(),
                password_hash: "x".to_string(),
                name: Some(email.to_string()),
            })
            .await
            .unwrap()
            .id
    }

    async fn task_for(store: &MemoryStore, owner: Uuid) -> Uuid {
        create_task(
            store,
            owner,
            NewTask {
                title: Some("Parent".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .task
        .id
    }

    fn titled(title: &str) -> SubtaskInput {
        SubtaskInput {
            title: Some(title.to_string()),
            order: None,
        }
    }

    #[tokio::test]
    async fn test_subtask_lifecycle() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner@example.com").await;
        let task_id = task_for(&store, owner).await;

        let first = create_subtask(&store, owner, task_id, titled("Draft")).await.unwrap();
        let second = create_subtask(&store, owner, task_id, titled("Review")).await.unwrap();
        assert_eq!((first.order, second.order), (1, 2));

        let done = update_subtask(
            &store,
            owner,
            task_id,
            first.id,
            SubtaskPatch {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(done.completed);
        assert_eq!(done.title, "Draft");

        delete_subtask(&store, owner, task_id, second.id).await.unwrap();
        let missing = delete_subtask(&store, owner, task_id, second.id).await.unwrap_err();
        assert!(matches!(missing, ServiceError::NotFound("Subtask")));
        assert_eq!(list_subtasks(&store, owner, task_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_children_hidden_from_strangers() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner@example.com").await;
        let stranger = user(&store, "stranger@example.com").await;
        let task_id = task_for(&store, owner).await;

        let err = add_comment(
            &store,
            stranger,
            task_id,
            CommentInput {
                content: Some("hi".to_string()),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.denial_kind(), Some(DenialKind::NotFound));

        let err = list_attachments(&store, stranger, task_id).await.unwrap_err();
        assert_eq!(err.denial_kind(), Some(DenialKind::NotFound));
    }

    #[tokio::test]
    async fn test_comments_newest_first_with_author() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner@example.com").await;
        let task_id = task_for(&store, owner).await;

        for content in ["first", "second"] {
            add_comment(
                &store,
                owner,
                task_id,
                CommentInput {
                    content: Some(content.to_string()),
                },
            )
            .await
            .unwrap();
        }

        let comments = list_comments(&store, owner, task_id).await.unwrap();
        assert_eq!(comments[0].comment.content, "second");
        assert_eq!(
            comments[0].user.as_ref().map(|u| u.email.as_str()),
            Some("owner@example.com")
        );
    }

    #[tokio::test]
    async fn test_attachment_validation() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner@example.com").await;
        let task_id = task_for(&store, owner).await;

        let bad = add_attachment(
            &store,
            owner,
            task_id,
            AttachmentInput {
                name: Some("brief.pdf".to_string()),
                url: Some("https://files.example.com/brief.pdf".to_string()),
                size: Some(-1),
                mime_type: Some("application/pdf".to_string()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(bad, ServiceError::Validation(_)));

        let ok = add_attachment(
            &store,
            owner,
            task_id,
            AttachmentInput {
                name: Some("brief.pdf".to_string()),
                url: Some("https://files.example.com/brief.pdf".to_string()),
                size: Some(2048),
                mime_type: Some("application/pdf".to_string()),
            },
        )
        .await
        .unwrap();
        delete_attachment(&store, owner, task_id, ok.id).await.unwrap();
        assert!(list_attachments(&store, owner, task_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tags_shared_by_name() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner@example.com").await;
        let first = task_for(&store, owner).await;
        let second = task_for(&store, owner).await;

        let a = add_tag(
            &store,
            owner,
            first,
            TagInput {
                name: Some("urgent".to_string()),
                color: Some("#FF0000".to_string()),
            },
        )
        .await
        .unwrap();
        let b = add_tag(
            &store,
            owner,
            second,
            TagInput {
                name: Some("urgent".to_string()),
                color: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.color, "#FF0000");

        remove_tag(&store, owner, first, a.id).await.unwrap();
        assert!(store.list_task_tags(first).await.unwrap().is_empty());
        assert_eq!(store.list_task_tags(second).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_children_removed_with_task() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner@example.com").await;
        let task_id = task_for(&store, owner).await;
        create_subtask(&store, owner, task_id, titled("Draft")).await.unwrap();

        delete_task(&store, owner, task_id).await.unwrap();
        assert!(store.list_subtasks(task_id).await.unwrap().is_empty());
    }
}
