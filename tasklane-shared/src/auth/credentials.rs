/// Credential verification for email/password login
///
/// Unknown email and wrong password produce the same
/// [`CredentialError::InvalidCredentials`], so the login endpoint cannot be
/// used to probe which accounts exist.

use tracing::debug;

use super::password::{verify_password, PasswordError};
use crate::models::user::User;
use crate::store::{Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Trims and lowercases an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Returns the user whose stored hash matches `password`
pub async fn verify_credentials(
    store: &dyn Store,
    email: &str,
    password: &str,
) -> Result<User, CredentialError> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(CredentialError::InvalidCredentials);
    }

    let Some(user) = store.find_user_by_email(&email).await? else {
        debug!("Login attempt for unknown email");
        return Err(CredentialError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash)? {
        debug!(user_id = %user.id, "Login attempt with wrong password");
        return Err(CredentialError::InvalidCredentials);
    }

    Ok(user)
}
