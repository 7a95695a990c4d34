/// Task operations
///
/// Tasks are visible to their owner and assignee. Only the owner may delete
/// one. A task created without a project goes to the caller's default
/// container, which is provisioned on first use.
///
/// `completed_at` tracks the status: it is stamped when a task enters
/// COMPLETED without an explicit timestamp and cleared whenever the
/// resulting status is anything else.
///
/// # Example
///
/// ```
/// use tasklane_shared::services::tasks::{self, NewTask, TaskPatch};
/// use tasklane_shared::models::task::TaskStatus;
/// use tasklane_shared::models::user::CreateUser;
/// use tasklane_shared::store::{MemoryStore, Store};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), tasklane_shared::error::ServiceError> {
/// let store = MemoryStore::new();
/// let user = store.create_user(CreateUser {
///     email: "dev@example.com".into(),
///     password_hash: "x".into(),
///     name: None,
/// }).await?;
///
/// let created = tasks::create_task(&store, user.id, NewTask {
///     title: Some("Ship it".into()),
///     status: Some(TaskStatus::Completed),
///     ..Default::default()
/// }).await?;
/// assert!(created.task.completed_at.is_some());
///
/// let reopened = tasks::update_task(&store, user.id, created.task.id, TaskPatch {
///     status: Some(TaskStatus::Todo),
///     ..Default::default()
/// }).await?;
/// assert!(reopened.task.completed_at.is_none());
/// # Ok(())
/// # }
/// ```

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::views::{TaskDetail, TaskView, ViewAssembler};
use super::{double_option, non_blank, parse_due_date, required};
use crate::access::guard::{Action, AuthorizationGuard};
use crate::access::membership::EntityRef;
use crate::error::{ServiceError, ServiceResult};
use crate::hierarchy::HierarchyManager;
use crate::models::task::{CreateTask, Task, TaskFilter, TaskPriority, TaskStatus, UpdateTask};
use crate::store::Store;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Blank or absent selects the default container
    pub project_id: Option<String>,
    /// Blank or absent leaves the task unsectioned
    pub section_id: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    /// RFC 3339 or `YYYY-MM-DD`
    pub due_date: Option<String>,
    /// Blank means unassigned
    pub assignee_id: Option<String>,
}

/// Absent fields are left alone; `null` clears the nullable ones
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub completed_at: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub project_id: Option<Uuid>,
}

fn parse_id(value: Option<String>, field: &str) -> ServiceResult<Option<Uuid>> {
    non_blank(value)
        .map(|v| Uuid::parse_str(&v).map_err(|_| ServiceError::validation(format!("Invalid {}", field))))
        .transpose()
}

fn parse_timestamp(value: Option<String>) -> ServiceResult<Option<DateTime<Utc>>> {
    non_blank(value).map(|v| parse_due_date(&v)).transpose()
}

/// `completed_at` after a change to `status`, given what was stored and
/// what the caller supplied
fn resolve_completed_at(
    status: TaskStatus,
    stored: Option<DateTime<Utc>>,
    supplied: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if status.is_completed() {
        supplied.or(stored).or(Some(now))
    } else {
        None
    }
}

/// List order: status ascending, priority descending, order ascending,
/// newest first
fn sort_for_listing(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| (t.status, Reverse(t.priority), t.order, Reverse(t.created_at)));
}

async fn require_existing_user(store: &dyn Store, user_id: Option<Uuid>) -> ServiceResult<()> {
    if let Some(id) = user_id {
        if store.find_user_by_id(id).await?.is_none() {
            return Err(ServiceError::validation("Assignee does not exist"));
        }
    }
    Ok(())
}

/// Tasks the caller owns or is assigned to, optionally within one project
pub async fn list_tasks(store: &dyn Store, user_id: Uuid, query: TaskQuery) -> ServiceResult<Vec<TaskView>> {
    let filter = TaskFilter {
        project_id: query.project_id,
        ..TaskFilter::involving(user_id)
    };
    let mut tasks = store.list_tasks(&filter).await?;
    sort_for_listing(&mut tasks);

    let assembler = ViewAssembler::new(store);
    let mut views = Vec::with_capacity(tasks.len());
    for task in tasks {
        views.push(assembler.task_view(task, TaskDetail::List).await?);
    }
    Ok(views)
}

pub async fn create_task(store: &dyn Store, user_id: Uuid, input: NewTask) -> ServiceResult<TaskView> {
    let title = required(input.title, "Title is required")?;
    let project_id = parse_id(input.project_id, "project ID")?;
    let section_id = parse_id(input.section_id, "section ID")?;
    let assignee_id = parse_id(input.assignee_id, "assignee ID")?;
    let due_date = parse_timestamp(input.due_date)?;

    let hierarchy = HierarchyManager::new(store);
    let project_id = match project_id {
        Some(id) => {
            AuthorizationGuard::new(store)
                .require(user_id, Action::CreateTask, EntityRef::Project(id))
                .await?;
            id
        }
        None => hierarchy.ensure_default_container(user_id).await?,
    };

    if let Some(id) = section_id {
        match store.find_section(id).await? {
            Some(section) if section.project_id == project_id => {}
            _ => {
                return Err(ServiceError::validation(
                    "Section does not belong to this project",
                ))
            }
        }
    }
    require_existing_user(store, assignee_id).await?;

    let status = input.status.unwrap_or_default();
    let order = hierarchy.next_task_order(project_id, section_id).await?;
    let task = store
        .create_task(CreateTask {
            project_id,
            section_id,
            owner_id: user_id,
            assignee_id,
            title,
            description: non_blank(input.description),
            status,
            priority: input.priority.unwrap_or_default(),
            due_date,
            completed_at: resolve_completed_at(status, None, None, Utc::now()),
            order,
        })
        .await?;

    info!(user_id = %user_id, project_id = %project_id, task_id = %task.id, order, "Task created");
    Ok(ViewAssembler::new(store)
        .task_view(task, TaskDetail::Summary)
        .await?)
}

/// The task with all comments and attachments
pub async fn get_task(store: &dyn Store, user_id: Uuid, task_id: Uuid) -> ServiceResult<TaskView> {
    AuthorizationGuard::new(store)
        .require(user_id, Action::ViewTask, EntityRef::Task(task_id))
        .await?;

    let task = store
        .find_task(task_id)
        .await?
        .ok_or(ServiceError::NotFound("Task"))?;
    Ok(ViewAssembler::new(store).task_view(task, TaskDetail::Full).await?)
}

pub async fn update_task(store: &dyn Store, user_id: Uuid, task_id: Uuid, patch: TaskPatch) -> ServiceResult<TaskView> {
    let title = match patch.title {
        Some(title) => Some(required(Some(title), "Title cannot be empty")?),
        None => None,
    };
    let due_date = patch.due_date.map(parse_timestamp).transpose()?;
    let assignee_id = patch
        .assignee_id
        .map(|id| parse_id(id, "assignee ID"))
        .transpose()?;
    let supplied_completed_at = patch.completed_at.map(parse_timestamp).transpose()?.flatten();

    AuthorizationGuard::new(store)
        .require(user_id, Action::UpdateTask, EntityRef::Task(task_id))
        .await?;

    let existing = store
        .find_task(task_id)
        .await?
        .ok_or(ServiceError::NotFound("Task"))?;
    if let Some(assignee) = assignee_id {
        require_existing_user(store, assignee).await?;
    }

    let status = patch.status.unwrap_or(existing.status);
    let completed_at = resolve_completed_at(
        status,
        existing.completed_at.filter(|_| existing.status.is_completed()),
        supplied_completed_at,
        Utc::now(),
    );

    let update = UpdateTask {
        title,
        description: patch.description.map(non_blank),
        status: patch.status,
        priority: patch.priority,
        due_date,
        assignee_id,
        completed_at: (completed_at != existing.completed_at).then_some(completed_at),
    };
    let task = store
        .update_task(task_id, update)
        .await?
        .ok_or(ServiceError::NotFound("Task"))?;

    info!(user_id = %user_id, task_id = %task_id, status = ?task.status, "Task updated");
    Ok(ViewAssembler::new(store)
        .task_view(task, TaskDetail::Summary)
        .await?)
}

/// Owner only; subtasks, comments, attachments and tag links go with it
pub async fn delete_task(store: &dyn Store, user_id: Uuid, task_id: Uuid) -> ServiceResult<()> {
    AuthorizationGuard::new(store)
        .require(user_id, Action::DeleteTask, EntityRef::Task(task_id))
        .await?;

    if !store.delete_task(task_id).await? {
        return Err(ServiceError::NotFound("Task"));
    }

    info!(user_id = %user_id, task_id = %task_id, "Task deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task(status: TaskStatus, priority: TaskPriority, order: i32, age_minutes: i64) -> Task {
        let created = Utc::now() - Duration::minutes(age_minutes);
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::nil(),
            section_id: None,
            owner_id: Uuid::nil(),
            assignee_id: None,
            title: format!("{:?}/{:?}/{}", status, priority, order),
            description: None,
            status,
            priority,
            due_date: None,
            completed_at: None,
            order,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_listing_order() {
        let mut tasks = vec![
            task(TaskStatus::Completed, TaskPriority::Urgent, 1, 0),
            task(TaskStatus::Todo, TaskPriority::Low, 1, 0),
            task(TaskStatus::Todo, TaskPriority::High, 2, 0),
            task(TaskStatus::Todo, TaskPriority::High, 1, 10),
            task(TaskStatus::Todo, TaskPriority::High, 1, 5),
        ];
        let newest_high = tasks[4].id;
        let oldest_high = tasks[3].id;

        sort_for_listing(&mut tasks);

        assert_eq!(tasks[0].id, newest_high);
        assert_eq!(tasks[1].id, oldest_high);
        assert_eq!(tasks[2].order, 2);
        assert_eq!(tasks[3].priority, TaskPriority::Low);
        assert_eq!(tasks[4].status, TaskStatus::Completed);
    }

    #[test]
    fn test_resolve_completed_at() {
        let now = Utc::now();
        let earlier = now - Duration::days(1);

        assert_eq!(resolve_completed_at(TaskStatus::Completed, None, None, now), Some(now));
        assert_eq!(
            resolve_completed_at(TaskStatus::Completed, Some(earlier), None, now),
            Some(earlier)
        );
        assert_eq!(
            resolve_completed_at(TaskStatus::Completed, Some(now), Some(earlier), now),
            Some(earlier)
        );
        assert_eq!(resolve_completed_at(TaskStatus::Review, Some(earlier), None, now), None);
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id(Some("  ".to_string()), "assignee ID").unwrap(), None);
        assert!(parse_id(Some("nope".to_string()), "assignee ID").is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_id(Some(id.to_string()), "assignee ID").unwrap(), Some(id));
    }
}
