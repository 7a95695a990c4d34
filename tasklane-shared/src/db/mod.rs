/// Postgres plumbing for the [`crate::store::PgStore`] backend
///
/// - `pool`: connection pool construction, health check, stats
/// - `migrations`: embedded schema migrations
///
/// # Example
///
/// ```no_run
/// use tasklane_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig::new(std::env::var("DATABASE_URL")?)).await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
