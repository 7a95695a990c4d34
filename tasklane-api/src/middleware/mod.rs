/// Middleware modules for the API server
///
/// Authentication lives in `tasklane_shared::auth::middleware` so the guard
/// and the HTTP layer share one `AuthContext`; this crate only adds the
/// response-side security headers.

pub mod security;
