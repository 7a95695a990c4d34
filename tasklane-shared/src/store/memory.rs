/// In-process [`Store`]
///
/// Rows are kept in insertion order inside plain `Vec`s behind one
/// `tokio::sync::RwLock`, so "oldest"/"newest" orderings are exact even when
/// timestamps tie. Unique constraints, foreign keys and cascades mirror the
/// Postgres schema, including the `ON DELETE RESTRICT` from tasks to
/// projects.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{constraints, Store, StoreError, StoreResult};
use crate::models::attachment::{Attachment, CreateAttachment};
use crate::models::comment::{Comment, CreateComment};
use crate::models::project::{CreateProject, Project, ProjectCounts, UpdateProject};
use crate::models::section::{NewSection, Section};
use crate::models::session::{CreateSession, Session};
use crate::models::subtask::{CreateSubtask, Subtask, UpdateSubtask};
use crate::models::tag::Tag;
use crate::models::task::{CreateTask, Task, TaskCounts, TaskFilter, UpdateTask};
use crate::models::user::{CreateUser, User};
use crate::models::workspace::{CreateWorkspace, Workspace, WorkspaceMembership};
use crate::models::workspace_member::{CreateWorkspaceMember, WorkspaceMember, WorkspaceRole};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    sessions: Vec<Session>,
    workspaces: Vec<Workspace>,
    members: Vec<WorkspaceMember>,
    projects: Vec<Project>,
    sections: Vec<Section>,
    tasks: Vec<Task>,
    subtasks: Vec<Subtask>,
    comments: Vec<Comment>,
    attachments: Vec<Attachment>,
    tags: Vec<Tag>,
    task_tags: Vec<(Uuid, Uuid)>,
}

impl Tables {
    fn require_user(&self, id: Uuid, fk: &str) -> StoreResult<()> {
        if self.users.iter().any(|u| u.id == id) {
            Ok(())
        } else {
            Err(StoreError::InvalidReference(fk.to_string()))
        }
    }

    fn require_task(&self, id: Uuid, fk: &str) -> StoreResult<()> {
        if self.tasks.iter().any(|t| t.id == id) {
            Ok(())
        } else {
            Err(StoreError::InvalidReference(fk.to_string()))
        }
    }

    fn project_name_taken(&self, workspace_id: Uuid, name: &str, except: Option<Uuid>) -> bool {
        self.projects.iter().any(|p| {
            p.workspace_id == workspace_id && p.name == name && Some(p.id) != except
        })
    }
}

/// Cheap to clone; clones share the same tables
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        if t.users.iter().any(|u| u.email == data.email) {
            return Err(StoreError::Conflict(constraints::USER_EMAIL.to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            email_verified: false,
            password_hash: data.password_hash,
            name: data.name,
            avatar: None,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if let Some(user) = t.users.iter_mut().find(|u| u.id == id) {
            let now = Utc::now();
            user.last_login_at = Some(now);
            user.updated_at = now;
        }
        Ok(())
    }

    async fn create_session(&self, data: CreateSession) -> StoreResult<Session> {
        let mut t = self.tables.write().await;
        t.require_user(data.user_id, "sessions_user_id_fkey")?;
        if t.sessions.iter().any(|s| s.token_hash == data.token_hash) {
            return Err(StoreError::Conflict(constraints::SESSION_TOKEN_HASH.to_string()));
        }

        let session = Session {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            token_hash: data.token_hash,
            expires_at: data.expires_at,
            created_at: Utc::now(),
        };
        t.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        let t = self.tables.read().await;
        Ok(t.sessions.iter().find(|s| s.token_hash == token_hash).cloned())
    }

    async fn delete_session(&self, token_hash: &str) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let before = t.sessions.len();
        t.sessions.retain(|s| s.token_hash != token_hash);
        Ok(t.sessions.len() < before)
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut t = self.tables.write().await;
        let before = t.sessions.len();
        t.sessions.retain(|s| !s.is_expired_at(now));
        Ok((before - t.sessions.len()) as u64)
    }

    async fn create_workspace(&self, data: CreateWorkspace) -> StoreResult<Workspace> {
        let mut t = self.tables.write().await;
        t.require_user(data.creator_id, "workspace_members_user_id_fkey")?;
        if t.workspaces.iter().any(|w| w.slug == data.slug) {
            return Err(StoreError::Conflict(constraints::WORKSPACE_SLUG.to_string()));
        }

        let now = Utc::now();
        let workspace = Workspace {
            id: Uuid::new_v4(),
            name: data.name,
            slug: data.slug,
            description: data.description,
            created_at: now,
            updated_at: now,
        };
        t.workspaces.push(workspace.clone());
        t.members.push(WorkspaceMember {
            id: Uuid::new_v4(),
            user_id: data.creator_id,
            workspace_id: workspace.id,
            role: WorkspaceRole::Admin,
            joined_at: now,
        });
        Ok(workspace)
    }

    async fn find_workspace(&self, id: Uuid) -> StoreResult<Option<Workspace>> {
        let t = self.tables.read().await;
        Ok(t.workspaces.iter().find(|w| w.id == id).cloned())
    }

    async fn first_workspace_for_user(&self, user_id: Uuid) -> StoreResult<Option<Workspace>> {
        let t = self.tables.read().await;
        let first = t
            .members
            .iter()
            .filter(|m| m.user_id == user_id)
            .find_map(|m| t.workspaces.iter().find(|w| w.id == m.workspace_id))
            .cloned();
        Ok(first)
    }

    async fn list_workspaces_for_user(&self, user_id: Uuid) -> StoreResult<Vec<WorkspaceMembership>> {
        let t = self.tables.read().await;
        let memberships = t
            .members
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| {
                t.workspaces
                    .iter()
                    .find(|w| w.id == m.workspace_id)
                    .map(|w| WorkspaceMembership {
                        workspace: w.clone(),
                        role: m.role,
                        joined_at: m.joined_at,
                    })
            })
            .collect();
        Ok(memberships)
    }

    async fn add_member(&self, data: CreateWorkspaceMember) -> StoreResult<WorkspaceMember> {
        let mut t = self.tables.write().await;
        t.require_user(data.user_id, "workspace_members_user_id_fkey")?;
        if !t.workspaces.iter().any(|w| w.id == data.workspace_id) {
            return Err(StoreError::InvalidReference(
                "workspace_members_workspace_id_fkey".to_string(),
            ));
        }
        if t
            .members
            .iter()
            .any(|m| m.user_id == data.user_id && m.workspace_id == data.workspace_id)
        {
            return Err(StoreError::Conflict(constraints::WORKSPACE_MEMBER.to_string()));
        }

        let member = WorkspaceMember {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            workspace_id: data.workspace_id,
            role: data.role,
            joined_at: Utc::now(),
        };
        t.members.push(member.clone());
        Ok(member)
    }

    async fn find_role(&self, workspace_id: Uuid, user_id: Uuid) -> StoreResult<Option<WorkspaceRole>> {
        let t = self.tables.read().await;
        Ok(t
            .members
            .iter()
            .find(|m| m.workspace_id == workspace_id && m.user_id == user_id)
            .map(|m| m.role))
    }

    async fn list_members(&self, workspace_id: Uuid) -> StoreResult<Vec<WorkspaceMember>> {
        let t = self.tables.read().await;
        Ok(t
            .members
            .iter()
            .filter(|m| m.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn create_project(&self, data: CreateProject) -> StoreResult<Project> {
        let mut t = self.tables.write().await;
        if !t.workspaces.iter().any(|w| w.id == data.workspace_id) {
            return Err(StoreError::InvalidReference("projects_workspace_id_fkey".to_string()));
        }
        if t.project_name_taken(data.workspace_id, &data.name, None) {
            return Err(StoreError::Conflict(constraints::PROJECT_NAME.to_string()));
        }

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            workspace_id: data.workspace_id,
            name: data.name,
            description: data.description,
            color: data.color,
            icon: data.icon,
            created_at: now,
            updated_at: now,
        };
        t.projects.push(project.clone());
        Ok(project)
    }

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        let t = self.tables.read().await;
        Ok(t.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn first_project_in_workspace(&self, workspace_id: Uuid) -> StoreResult<Option<Project>> {
        let t = self.tables.read().await;
        Ok(t
            .projects
            .iter()
            .find(|p| p.workspace_id == workspace_id)
            .cloned())
    }

    async fn list_projects(&self, workspace_id: Uuid) -> StoreResult<Vec<Project>> {
        let t = self.tables.read().await;
        Ok(t
            .projects
            .iter()
            .rev()
            .filter(|p| p.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn update_project(&self, id: Uuid, data: UpdateProject) -> StoreResult<Option<Project>> {
        let mut t = self.tables.write().await;
        let Some(workspace_id) = t.projects.iter().find(|p| p.id == id).map(|p| p.workspace_id)
        else {
            return Ok(None);
        };
        if let Some(name) = &data.name {
            if t.project_name_taken(workspace_id, name, Some(id)) {
                return Err(StoreError::Conflict(constraints::PROJECT_NAME.to_string()));
            }
        }

        let Some(project) = t.projects.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = data.name {
            project.name = name;
        }
        if let Some(description) = data.description {
            project.description = description;
        }
        if let Some(color) = data.color {
            project.color = color;
        }
        if let Some(icon) = data.icon {
            project.icon = icon;
        }
        project.updated_at = Utc::now();
        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        if !t.projects.iter().any(|p| p.id == id) {
            return Ok(false);
        }
        if t.tasks.iter().any(|task| task.project_id == id) {
            return Err(StoreError::InvalidReference("tasks_project_id_fkey".to_string()));
        }

        t.projects.retain(|p| p.id != id);
        t.sections.retain(|s| s.project_id != id);
        Ok(true)
    }

    async fn project_counts(&self, id: Uuid) -> StoreResult<ProjectCounts> {
        let t = self.tables.read().await;
        Ok(ProjectCounts {
            tasks: t.tasks.iter().filter(|task| task.project_id == id).count() as i64,
            sections: t.sections.iter().filter(|s| s.project_id == id).count() as i64,
        })
    }

    async fn create_sections(&self, project_id: Uuid, sections: Vec<NewSection>) -> StoreResult<Vec<Section>> {
        let mut t = self.tables.write().await;
        if !t.projects.iter().any(|p| p.id == project_id) {
            return Err(StoreError::InvalidReference("sections_project_id_fkey".to_string()));
        }

        let now = Utc::now();
        let created: Vec<Section> = sections
            .into_iter()
            .map(|s| Section {
                id: Uuid::new_v4(),
                project_id,
                name: s.name,
                order: s.order,
                created_at: now,
            })
            .collect();
        t.sections.extend(created.iter().cloned());
        Ok(created)
    }

    async fn find_section(&self, id: Uuid) -> StoreResult<Option<Section>> {
        let t = self.tables.read().await;
        Ok(t.sections.iter().find(|s| s.id == id).cloned())
    }

    async fn list_sections(&self, project_id: Uuid) -> StoreResult<Vec<Section>> {
        let t = self.tables.read().await;
        let mut sections: Vec<Section> = t
            .sections
            .iter()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect();
        sections.sort_by_key(|s| s.order);
        Ok(sections)
    }

    async fn max_section_order(&self, project_id: Uuid) -> StoreResult<Option<i32>> {
        let t = self.tables.read().await;
        Ok(t
            .sections
            .iter()
            .filter(|s| s.project_id == project_id)
            .map(|s| s.order)
            .max())
    }

    async fn count_section_tasks(&self, section_id: Uuid) -> StoreResult<i64> {
        let t = self.tables.read().await;
        Ok(t
            .tasks
            .iter()
            .filter(|task| task.section_id == Some(section_id))
            .count() as i64)
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        let mut t = self.tables.write().await;
        if !t.projects.iter().any(|p| p.id == data.project_id) {
            return Err(StoreError::InvalidReference("tasks_project_id_fkey".to_string()));
        }
        if let Some(section_id) = data.section_id {
            if !t.sections.iter().any(|s| s.id == section_id) {
                return Err(StoreError::InvalidReference("tasks_section_id_fkey".to_string()));
            }
        }
        t.require_user(data.owner_id, "tasks_owner_id_fkey")?;
        if let Some(assignee_id) = data.assignee_id {
            t.require_user(assignee_id, "tasks_assignee_id_fkey")?;
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            project_id: data.project_id,
            section_id: data.section_id,
            owner_id: data.owner_id,
            assignee_id: data.assignee_id,
            title: data.title,
            description: data.description,
            status: data.status,
            priority: data.priority,
            due_date: data.due_date,
            completed_at: data.completed_at,
            order: data.order,
            created_at: now,
            updated_at: now,
        };
        t.tasks.push(task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let t = self.tables.read().await;
        Ok(t.tasks.iter().find(|task| task.id == id).cloned())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let t = self.tables.read().await;
        let mut tasks: Vec<Task> = t
            .tasks
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        tasks.sort_by_key(|task| task.order);
        Ok(tasks)
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>> {
        let mut t = self.tables.write().await;
        if let Some(Some(assignee_id)) = data.assignee_id {
            t.require_user(assignee_id, "tasks_assignee_id_fkey")?;
        }

        let Some(task) = t.tasks.iter_mut().find(|task| task.id == id) else {
            return Ok(None);
        };
        if let Some(title) = data.title {
            task.title = title;
        }
        if let Some(description) = data.description {
            task.description = description;
        }
        if let Some(status) = data.status {
            task.status = status;
        }
        if let Some(priority) = data.priority {
            task.priority = priority;
        }
        if let Some(due_date) = data.due_date {
            task.due_date = due_date;
        }
        if let Some(assignee_id) = data.assignee_id {
            task.assignee_id = assignee_id;
        }
        if let Some(completed_at) = data.completed_at {
            task.completed_at = completed_at;
        }
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let before = t.tasks.len();
        t.tasks.retain(|task| task.id != id);
        if t.tasks.len() == before {
            return Ok(false);
        }

        t.subtasks.retain(|s| s.task_id != id);
        t.comments.retain(|c| c.task_id != id);
        t.attachments.retain(|a| a.task_id != id);
        t.task_tags.retain(|(task_id, _)| *task_id != id);
        Ok(true)
    }

    async fn max_task_order(&self, project_id: Uuid, section_id: Option<Uuid>) -> StoreResult<Option<i32>> {
        let t = self.tables.read().await;
        Ok(t
            .tasks
            .iter()
            .filter(|task| task.project_id == project_id && task.section_id == section_id)
            .map(|task| task.order)
            .max())
    }

    async fn task_counts(&self, id: Uuid) -> StoreResult<TaskCounts> {
        let t = self.tables.read().await;
        Ok(TaskCounts {
            subtasks: t.subtasks.iter().filter(|s| s.task_id == id).count() as i64,
            comments: t.comments.iter().filter(|c| c.task_id == id).count() as i64,
            attachments: t.attachments.iter().filter(|a| a.task_id == id).count() as i64,
        })
    }

    async fn create_subtask(&self, data: CreateSubtask) -> StoreResult<Subtask> {
        let mut t = self.tables.write().await;
        t.require_task(data.task_id, "subtasks_task_id_fkey")?;

        let subtask = Subtask {
            id: Uuid::new_v4(),
            task_id: data.task_id,
            title: data.title,
            completed: false,
            order: data.order,
            created_at: Utc::now(),
        };
        t.subtasks.push(subtask.clone());
        Ok(subtask)
    }

    async fn list_subtasks(&self, task_id: Uuid) -> StoreResult<Vec<Subtask>> {
        let t = self.tables.read().await;
        let mut subtasks: Vec<Subtask> = t
            .subtasks
            .iter()
            .filter(|s| s.task_id == task_id)
            .cloned()
            .collect();
        subtasks.sort_by_key(|s| s.order);
        Ok(subtasks)
    }

    async fn max_subtask_order(&self, task_id: Uuid) -> StoreResult<Option<i32>> {
        let t = self.tables.read().await;
        Ok(t
            .subtasks
            .iter()
            .filter(|s| s.task_id == task_id)
            .map(|s| s.order)
            .max())
    }

    async fn update_subtask(&self, task_id: Uuid, id: Uuid, data: UpdateSubtask) -> StoreResult<Option<Subtask>> {
        let mut t = self.tables.write().await;
        let Some(subtask) = t
            .subtasks
            .iter_mut()
            .find(|s| s.id == id && s.task_id == task_id)
        else {
            return Ok(None);
        };
        if let Some(title) = data.title {
            subtask.title = title;
        }
        if let Some(completed) = data.completed {
            subtask.completed = completed;
        }
        if let Some(order) = data.order {
            subtask.order = order;
        }
        Ok(Some(subtask.clone()))
    }

    async fn delete_subtask(&self, task_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let before = t.subtasks.len();
        t.subtasks.retain(|s| !(s.id == id && s.task_id == task_id));
        Ok(t.subtasks.len() < before)
    }

    async fn create_comment(&self, data: CreateComment) -> StoreResult<Comment> {
        let mut t = self.tables.write().await;
        t.require_task(data.task_id, "comments_task_id_fkey")?;
        t.require_user(data.user_id, "comments_user_id_fkey")?;

        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            task_id: data.task_id,
            user_id: data.user_id,
            content: data.content,
            created_at: now,
            updated_at: now,
        };
        t.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, task_id: Uuid, limit: Option<i64>) -> StoreResult<Vec<Comment>> {
        let t = self.tables.read().await;
        let limit = limit.map_or(usize::MAX, |l| l.max(0) as usize);
        Ok(t
            .comments
            .iter()
            .rev()
            .filter(|c| c.task_id == task_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn create_attachment(&self, data: CreateAttachment) -> StoreResult<Attachment> {
        let mut t = self.tables.write().await;
        t.require_task(data.task_id, "attachments_task_id_fkey")?;

        let attachment = Attachment {
            id: Uuid::new_v4(),
            task_id: data.task_id,
            name: data.name,
            url: data.url,
            size: data.size,
            mime_type: data.mime_type,
            created_at: Utc::now(),
        };
        t.attachments.push(attachment.clone());
        Ok(attachment)
    }

    async fn list_attachments(&self, task_id: Uuid) -> StoreResult<Vec<Attachment>> {
        let t = self.tables.read().await;
        Ok(t
            .attachments
            .iter()
            .rev()
            .filter(|a| a.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn delete_attachment(&self, task_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let before = t.attachments.len();
        t.attachments.retain(|a| !(a.id == id && a.task_id == task_id));
        Ok(t.attachments.len() < before)
    }

    async fn upsert_tag(&self, name: &str, color: &str) -> StoreResult<Tag> {
        let mut t = self.tables.write().await;
        if let Some(existing) = t.tags.iter().find(|tag| tag.name == name) {
            return Ok(existing.clone());
        }

        let tag = Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
            color: color.to_string(),
        };
        t.tags.push(tag.clone());
        Ok(tag)
    }

    async fn attach_tag(&self, task_id: Uuid, tag_id: Uuid) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        t.require_task(task_id, "task_tags_task_id_fkey")?;
        if !t.tags.iter().any(|tag| tag.id == tag_id) {
            return Err(StoreError::InvalidReference("task_tags_tag_id_fkey".to_string()));
        }
        if !t.task_tags.contains(&(task_id, tag_id)) {
            t.task_tags.push((task_id, tag_id));
        }
        Ok(())
    }

    async fn detach_tag(&self, task_id: Uuid, tag_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let before = t.task_tags.len();
        t.task_tags.retain(|link| *link != (task_id, tag_id));
        Ok(t.task_tags.len() < before)
    }

    async fn list_task_tags(&self, task_id: Uuid) -> StoreResult<Vec<Tag>> {
        let t = self.tables.read().await;
        let mut tags: Vec<Tag> = t
            .task_tags
            .iter()
            .filter(|(linked_task, _)| *linked_task == task_id)
            .filter_map(|(_, tag_id)| t.tags.iter().find(|tag| tag.id == *tag_id).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }
}
