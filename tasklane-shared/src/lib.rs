//! # Tasklane Shared Library
//!
//! Domain core of the Tasklane task manager, used by the API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `store`: The persistence seam (Postgres and in-memory backends)
//! - `db`: Connection pool and migrations
//! - `auth`: Passwords, tokens, sessions and request authentication
//! - `access`: Membership resolution and the authorization guard
//! - `hierarchy`: Default containers and sibling ordering
//! - `services`: Access-controlled operations on workspaces, projects,
//!   sections and tasks
//! - `error`: Service error type

pub mod access;
pub mod auth;
pub mod db;
pub mod error;
pub mod hierarchy;
pub mod models;
pub mod services;
pub mod store;

/// Current version of the Tasklane shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
