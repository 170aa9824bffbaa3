//! API configuration.

use std::time::Duration;

/// Secret used when `SECRET_KEY` is unset outside production.
const DEV_SECRET_KEY: &str = "pyjobs-development-secret";

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL URL; the in-memory store is used when unset
    pub database_url: Option<String>,
    /// Pool size
    pub database_max_connections: u32,
    /// Keys close links and session tokens
    pub secret_key: String,
    /// Absolute site URL used in feeds, notifications and close links
    pub site_url: String,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second
    pub rate_limit_rps: u32,
    /// Max request body size
    pub max_body_size: usize,
    /// Session lifetime
    pub session_ttl: Duration,
    /// Receives application and feedback notifications; logged only when unset
    pub notify_webhook_url: Option<String>,
    /// Accounts registered with these usernames become staff
    pub staff_usernames: Vec<String>,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_url: None,
            database_max_connections: 10,
            secret_key: DEV_SECRET_KEY.to_string(),
            site_url: "http://localhost:8000".to_string(),
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            max_body_size: 1024 * 1024, // 1MB
            session_ttl: Duration::from_secs(14 * 24 * 3600),
            notify_webhook_url: None,
            staff_usernames: Vec::new(),
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            database_max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.database_max_connections),
            secret_key: std::env::var("SECRET_KEY")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.secret_key),
            site_url: std::env::var("SITE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.site_url),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_rps),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            session_ttl: std::env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|s| parse_session_ttl(&s))
                .unwrap_or(defaults.session_ttl),
            notify_webhook_url: std::env::var("NOTIFY_WEBHOOK_URL").ok().filter(|s| !s.is_empty()),
            staff_usernames: std::env::var("STAFF_USERNAMES")
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.staff_usernames),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    /// Refuse settings that are only acceptable for local development.
    pub fn validate(&self) -> Result<(), String> {
        if !self.is_production() {
            return Ok(());
        }
        if self.secret_key == DEV_SECRET_KEY {
            return Err("SECRET_KEY must be set in production".to_string());
        }
        if self.database_url.is_none() {
            return Err("DATABASE_URL must be set in production".to_string());
        }
        Ok(())
    }

    /// Whether a new account with this username is staff.
    pub fn is_staff_username(&self, username: &str) -> bool {
        self.staff_usernames.iter().any(|u| u == username)
    }

    /// Absolute URL for a site path.
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.site_url, path)
    }
}

/// `SESSION_TTL_HOURS` as a duration; unusable values yield `None`.
fn parse_session_ttl(hours: &str) -> Option<Duration> {
    let hours: u64 = hours.trim().parse().ok()?;
    hours.checked_mul(3600).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_requires_secret_and_database() {
        let mut config = ApiConfig {
            environment: "production".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.secret_key = "a-real-secret".to_string();
        assert!(config.validate().is_err());

        config.database_url = Some("postgres://localhost/pyjobs".to_string());
        assert!(config.validate().is_ok());

        assert!(ApiConfig::default().validate().is_ok());
    }

    #[test]
    fn test_absolute_url() {
        let config = ApiConfig::default();
        assert_eq!(config.absolute_url("/job/abc/"), "http://localhost:8000/job/abc/");
    }

    #[test]
    fn test_session_ttl_parsing() {
        assert_eq!(parse_session_ttl("24"), Some(Duration::from_secs(24 * 3600)));
        assert_eq!(parse_session_ttl("abc"), None);
        assert_eq!(parse_session_ttl(&u64::MAX.to_string()), None);
    }
}
