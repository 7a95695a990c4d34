/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `API_CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `API_PRODUCTION`: Enables HSTS and `Secure` cookies (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string; unset runs on the in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_ACCESS_SECRET`: Access token signing secret (required, ≥ 32 chars)
/// - `JWT_REFRESH_SECRET`: Refresh token signing secret (required, ≥ 32 chars, distinct)
/// - `JWT_ACCESS_TTL_MINUTES`: Access token lifetime (default: 15)
/// - `JWT_REFRESH_TTL_DAYS`: Refresh token lifetime and session expiry (default: 7)
/// - `RUST_LOG`: Log filter; `LOG_FORMAT=json` switches to JSON logs
///
/// # Example
///
/// ```no_run
/// use tasklane_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tasklane_shared::auth::jwt::TokenConfig;

const MIN_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Postgres settings; `None` runs on the in-memory store
    pub database: Option<DatabaseConfig>,

    /// JWT configuration
    pub jwt: JwtConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS, `Secure` cookies)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Signs access tokens. Generate with: `openssl rand -hex 32`
    pub access_secret: String,

    /// Signs refresh tokens; must differ from `access_secret`
    pub refresh_secret: String,

    pub access_ttl_minutes: i64,

    pub refresh_ttl_days: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("refresh_ttl_days", &self.refresh_ttl_days)
            .finish()
    }
}

impl JwtConfig {
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            access_secret: self.access_secret.clone(),
            refresh_secret: self.refresh_secret.clone(),
            access_ttl: Duration::minutes(self.access_ttl_minutes),
            refresh_ttl: Duration::days(self.refresh_ttl_days),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A JWT secret is missing, shorter than 32 characters, or both are equal
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "API_PORT", 8080u16)?;
        let cors_origins = lookup("API_CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();
        let production = parse_or(&lookup, "API_PRODUCTION", false)?;

        let database = match lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?,
            }),
            None => None,
        };

        let access_secret = lookup("JWT_ACCESS_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_ACCESS_SECRET environment variable is required"))?;
        let refresh_secret = lookup("JWT_REFRESH_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_REFRESH_SECRET environment variable is required"))?;

        if access_secret.len() < MIN_SECRET_LEN || refresh_secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("JWT secrets must be at least {} characters long", MIN_SECRET_LEN);
        }
        if access_secret == refresh_secret {
            anyhow::bail!("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ");
        }

        let access_ttl_minutes = parse_or(&lookup, "JWT_ACCESS_TTL_MINUTES", 15i64)?;
        let refresh_ttl_days = parse_or(&lookup, "JWT_REFRESH_TTL_DAYS", 7i64)?;
        if access_ttl_minutes <= 0 || refresh_ttl_days <= 0 {
            anyhow::bail!("JWT lifetimes must be positive");
        }

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
            },
            database,
            jwt: JwtConfig {
                access_secret,
                refresh_secret,
                access_ttl_minutes,
                refresh_ttl_days,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const SECRETS: [(&str, &str); 2] = [
        ("JWT_ACCESS_SECRET", "access-secret-at-least-32-bytes-long"),
        ("JWT_REFRESH_SECRET", "refresh-secret-at-least-32-bytes-long"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(&SECRETS).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert!(!config.api.production);
        assert!(config.database.is_none());
        assert_eq!(config.jwt.token_config().access_ttl, Duration::minutes(15));
        assert_eq!(config.jwt.token_config().refresh_ttl, Duration::days(7));
    }

    #[test]
    fn test_overrides() {
        let mut vars = SECRETS.to_vec();
        vars.extend([
            ("API_PORT", "3000"),
            ("API_CORS_ORIGINS", "https://app.example.com, https://admin.example.com"),
            ("API_PRODUCTION", "true"),
            ("DATABASE_URL", "postgresql://localhost/tasklane"),
        ]);
        let config = load(&vars).unwrap();

        assert_eq!(config.api.port, 3000);
        assert_eq!(config.api.cors_origins.len(), 2);
        assert!(config.api.production);
        assert_eq!(config.database.unwrap().max_connections, 10);
    }

    #[test]
    fn test_secret_rules() {
        assert!(load(&[]).is_err());
        assert!(load(&[("JWT_ACCESS_SECRET", "short"), SECRETS[1]]).is_err());

        let same = "same-secret-that-is-long-enough-to-pass";
        assert!(load(&[("JWT_ACCESS_SECRET", same), ("JWT_REFRESH_SECRET", same)]).is_err());
    }

    #[test]
    fn test_invalid_port() {
        let mut vars = SECRETS.to_vec();
        vars.push(("API_PORT", "eighty"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&SECRETS).unwrap();
        let debug = format!("{:?}", config.jwt);
        assert!(!debug.contains("access-secret"));
    }
}
