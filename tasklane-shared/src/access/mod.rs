/// Access control
///
/// - [`membership`]: resolves an entity to its workspace and the caller's role there
/// - [`guard`]: the policy table and the `authorize` decision function
///
/// Storage is always reached through [`crate::store::Store`], so the same
/// rules apply to the Postgres and in-memory backends.

pub mod guard;
pub mod membership;
