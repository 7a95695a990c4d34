/// Token service: access and refresh JWTs
///
/// Both kinds are HS256 JWTs carrying the principal's id and email. They are
/// signed with **different secrets** and carry a `token_type` claim, so a
/// refresh token can never pass as an access token or vice versa.
///
/// | Kind    | Default lifetime | Secret                |
/// |---------|------------------|-----------------------|
/// | access  | 15 minutes       | `JWT_ACCESS_SECRET`   |
/// | refresh | 7 days           | `JWT_REFRESH_SECRET`  |
///
/// Verification failures are either [`TokenError::Expired`] or
/// [`TokenError::Invalid`]; callers must treat both as unauthenticated.
/// The distinction only lets clients decide between "refresh and retry"
/// and "log in again".
///
/// # Example
///
/// ```
/// use tasklane_shared::auth::jwt::{Identity, TokenConfig, TokenKind, TokenService};
/// use uuid::Uuid;
///
/// let tokens = TokenService::new(TokenConfig::new(
///     "access-secret-with-at-least-32-bytes!!",
///     "refresh-secret-with-at-least-32-bytes!",
/// ));
///
/// let identity = Identity { user_id: Uuid::new_v4(), email: "user@example.com".into() };
/// let access = tokens.issue_access_token(&identity).unwrap();
///
/// assert_eq!(tokens.verify(&access, TokenKind::Access).unwrap(), identity);
/// assert!(tokens.verify(&access, TokenKind::Refresh).is_err());
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `iss` claim on every token
pub const ISSUER: &str = "tasklane";

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// The principal a token speaks for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
}

/// JWT payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub email: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    /// Unique per token, so two tokens minted in the same second differ
    pub jti: Uuid,
    pub token_type: TokenKind,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    /// Default lifetimes: 15 minutes / 7 days
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        TokenConfig {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        }
    }
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        KeyPair {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Issues and verifies tokens. Pure over its keys; no I/O.
pub struct TokenService {
    access: KeyPair,
    refresh: KeyPair,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        TokenService {
            access: KeyPair::from_secret(&config.access_secret),
            refresh: KeyPair::from_secret(&config.refresh_secret),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue_access_token(&self, identity: &Identity) -> Result<String, TokenError> {
        self.issue(identity, TokenKind::Access, self.access_ttl)
    }

    pub fn issue_refresh_token(&self, identity: &Identity) -> Result<String, TokenError> {
        self.issue(identity, TokenKind::Refresh, self.refresh_ttl)
    }

    /// Signs a token of `kind` that expires `ttl` from now. A negative `ttl`
    /// yields an already-expired token.
    pub fn issue(
        &self,
        identity: &Identity,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            user_id: identity.user_id,
            email: identity.email.clone(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4(),
            token_type: kind,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.keys(kind).encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verifies signature, issuer, expiry and kind
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Identity, TokenError> {
        let claims = self.decode_claims(token, kind)?;
        Ok(Identity {
            user_id: claims.user_id,
            email: claims.email,
        })
    }

    pub fn decode_claims(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.validate_nbf = true;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.keys(kind).decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;

        if data.claims.token_type != kind {
            return Err(TokenError::Invalid(format!(
                "expected {:?} token, got {:?}",
                kind, data.claims.token_type
            )));
        }

        Ok(data.claims)
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}
