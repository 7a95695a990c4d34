/// Response shapes
///
/// Views embed a record's related entities the way clients render them: a
/// task with its people, project, section, subtasks and tags; a project with
/// its sections and backlog. Record fields are flattened into the view, and
/// child counts are reported under `_count`.

use serde::Serialize;
use uuid::Uuid;

use crate::models::attachment::Attachment;
use crate::models::comment::Comment;
use crate::models::project::{Project, ProjectCounts};
use crate::models::section::Section;
use crate::models::subtask::Subtask;
use crate::models::tag::Tag;
use crate::models::task::{Task, TaskCounts};
use crate::models::user::UserSummary;
use crate::models::workspace::Workspace;
use crate::models::workspace_member::{WorkspaceMember, WorkspaceRole};
use crate::store::{Store, StoreResult};

/// Number of comments embedded per task in list responses
pub const LIST_COMMENT_LIMIT: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        ProjectSummary {
            id: project.id,
            name: project.name.clone(),
            color: project.color.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

impl From<&Workspace> for WorkspaceSummary {
    fn from(workspace: &Workspace) -> Self {
        WorkspaceSummary {
            id: workspace.id,
            name: workspace.name.clone(),
            slug: workspace.slug.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: Option<UserSummary>,
}

/// How much of a task's surroundings to load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskDetail {
    /// Relations and counts, no comments
    Summary,
    /// Plus the latest [`LIST_COMMENT_LIMIT`] comments
    List,
    /// Plus every comment and all attachments
    Full,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub owner: Option<UserSummary>,
    pub assignee: Option<UserSummary>,
    pub project: Option<ProjectSummary>,
    pub section: Option<SectionSummary>,
    pub subtasks: Vec<Subtask>,
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(rename = "_count")]
    pub counts: TaskCounts,
}

/// A task as it appears inside a project or section listing
#[derive(Debug, Clone, Serialize)]
pub struct TaskBrief {
    #[serde(flatten)]
    pub task: Task,
    pub owner: Option<UserSummary>,
    pub assignee: Option<UserSummary>,
    #[serde(rename = "_count")]
    pub counts: TaskCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionCounts {
    pub tasks: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    #[serde(flatten)]
    pub section: Section,
    #[serde(rename = "_count")]
    pub counts: SectionCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionWithTasks {
    #[serde(flatten)]
    pub section: Section,
    pub tasks: Vec<TaskBrief>,
    #[serde(rename = "_count")]
    pub counts: SectionCounts,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListItem {
    #[serde(flatten)]
    pub project: Project,
    pub workspace_name: String,
    pub member_role: WorkspaceRole,
    #[serde(rename = "_count")]
    pub counts: ProjectCounts,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub workspace: WorkspaceSummary,
    pub sections: Vec<SectionView>,
    /// Unsectioned tasks, by order
    pub tasks: Vec<TaskBrief>,
    pub member_role: WorkspaceRole,
    #[serde(rename = "_count")]
    pub counts: ProjectCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberView {
    #[serde(flatten)]
    pub member: WorkspaceMember,
    pub user: Option<UserSummary>,
}

/// Loads the related records a view embeds
pub struct ViewAssembler<'a> {
    store: &'a dyn Store,
}

impl<'a> ViewAssembler<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        ViewAssembler { store }
    }

    pub async fn user_summary(&self, user_id: Uuid) -> StoreResult<Option<UserSummary>> {
        Ok(self
            .store
            .find_user_by_id(user_id)
            .await?
            .as_ref()
            .map(UserSummary::from))
    }

    async fn optional_user(&self, user_id: Option<Uuid>) -> StoreResult<Option<UserSummary>> {
        match user_id {
            Some(id) => self.user_summary(id).await,
            None => Ok(None),
        }
    }

    async fn comment_views(&self, comments: Vec<Comment>) -> StoreResult<Vec<CommentView>> {
        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            let user = self.user_summary(comment.user_id).await?;
            views.push(CommentView { comment, user });
        }
        Ok(views)
    }

    pub async fn comment_view(&self, comment: Comment) -> StoreResult<CommentView> {
        let user = self.user_summary(comment.user_id).await?;
        Ok(CommentView { comment, user })
    }

    pub async fn task_view(&self, task: Task, detail: TaskDetail) -> StoreResult<TaskView> {
        let owner = self.user_summary(task.owner_id).await?;
        let assignee = self.optional_user(task.assignee_id).await?;
        let project = self
            .store
            .find_project(task.project_id)
            .await?
            .as_ref()
            .map(ProjectSummary::from);
        let section = match task.section_id {
            Some(id) => self.store.find_section(id).await?.map(|s| SectionSummary {
                id: s.id,
                name: s.name,
            }),
            None => None,
        };
        let subtasks = self.store.list_subtasks(task.id).await?;
        let tags = self.store.list_task_tags(task.id).await?;
        let counts = self.store.task_counts(task.id).await?;

        let comments = match detail {
            TaskDetail::Summary => None,
            TaskDetail::List => Some(
                self.comment_views(
                    self.store
                        .list_comments(task.id, Some(LIST_COMMENT_LIMIT))
                        .await?,
                )
                .await?,
            ),
            TaskDetail::Full => Some(
                self.comment_views(self.store.list_comments(task.id, None).await?)
                    .await?,
            ),
        };
        let attachments = match detail {
            TaskDetail::Full => Some(self.store.list_attachments(task.id).await?),
            _ => None,
        };

        Ok(TaskView {
            task,
            owner,
            assignee,
            project,
            section,
            subtasks,
            tags,
            comments,
            attachments,
            counts,
        })
    }

    pub async fn task_brief(&self, task: Task) -> StoreResult<TaskBrief> {
        let owner = self.user_summary(task.owner_id).await?;
        let assignee = self.optional_user(task.assignee_id).await?;
        let counts = self.store.task_counts(task.id).await?;
        Ok(TaskBrief {
            task,
            owner,
            assignee,
            counts,
        })
    }

    pub async fn task_briefs(&self, tasks: Vec<Task>) -> StoreResult<Vec<TaskBrief>> {
        let mut briefs = Vec::with_capacity(tasks.len());
        for task in tasks {
            briefs.push(self.task_brief(task).await?);
        }
        Ok(briefs)
    }

    pub async fn section_view(&self, section: Section) -> StoreResult<SectionView> {
        let tasks = self.store.count_section_tasks(section.id).await?;
        Ok(SectionView {
            section,
            counts: SectionCounts { tasks },
        })
    }

    pub async fn member_view(&self, member: WorkspaceMember) -> StoreResult<MemberView> {
        let user = self.user_summary(member.user_id).await?;
        Ok(MemberView { member, user })
    }
}
