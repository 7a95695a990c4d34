/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, refresh, logout and current user
/// - `workspaces`: Workspaces and their members
/// - `projects`: Projects and their sections
/// - `tasks`: Task CRUD
/// - `task_items`: Subtasks, comments, attachments and tags of a task

pub mod auth;
pub mod health;
pub mod projects;
pub mod task_items;
pub mod tasks;
pub mod workspaces;
