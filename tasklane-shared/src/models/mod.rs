/// Database models for Tasklane
///
/// One module per table. Each model carries its SQL as inherent
/// `async fn`s over a `&PgPool`; the rest of the crate reaches them only
/// through [`crate::store::Store`].
///
/// # Models
///
/// - `user`: accounts and credentials
/// - `session`: refresh-token ledger rows
/// - `workspace`: tenant containers
/// - `workspace_member`: (user, workspace, role) relation
/// - `project`: projects inside a workspace
/// - `section`: ordered buckets inside a project
/// - `task`: tasks, their status and priority
/// - `subtask`, `comment`, `attachment`, `tag`: task children
///
/// # Example
///
/// ```no_run
/// use tasklane_shared::models::user::{User, CreateUser};
/// use tasklane_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: Some("Jo Doe".to_string()),
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod attachment;
pub mod comment;
pub mod project;
pub mod section;
pub mod session;
pub mod subtask;
pub mod tag;
pub mod task;
pub mod user;
pub mod workspace;
pub mod workspace_member;
