/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and the registration strength policy
/// - [`credentials`]: email/password verification against the store
/// - [`jwt`]: the token service (access and refresh JWTs)
/// - [`session`]: the refresh-token session ledger
/// - [`middleware`]: axum request authentication and [`middleware::AuthContext`]
///
/// Authorization (who may touch which entity) lives in [`crate::access`].
///
/// # Example
///
/// ```
/// use tasklane_shared::auth::jwt::{Identity, TokenConfig, TokenKind, TokenService};
/// use tasklane_shared::auth::password::{hash_password_with, verify_password, HashCost};
/// use uuid::Uuid;
///
/// let hash = hash_password_with("secret123", HashCost::MINIMAL).unwrap();
/// assert!(verify_password("secret123", &hash).unwrap());
///
/// let tokens = TokenService::new(TokenConfig::new("a".repeat(32), "b".repeat(32)));
/// let identity = Identity { user_id: Uuid::new_v4(), email: "user@example.com".into() };
/// let token = tokens.issue_access_token(&identity).unwrap();
/// assert_eq!(tokens.verify(&token, TokenKind::Access).unwrap().email, "user@example.com");
/// ```

pub mod credentials;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod session;
