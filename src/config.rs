//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use crate::assets::CloudinaryConfig;
use crate::db::DbConfig;

const DEFAULT_ORIGINS: &[&str] = &["http://localhost:3000", "http://127.0.0.1:3000"];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub allowed_origins: Vec<String>,
    pub database: Option<DbConfig>,
    pub cloudinary: Option<CloudinaryConfig>,
    pub auth_secret: Option<String>,
    pub request_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str, fallback: u64| {
            value(key)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(fallback)
        };

        // ALLOWED_ORIGINS (comma-separated) wins over FRONTEND_ORIGIN.
        let allowed_origins = value("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .or_else(|| value("FRONTEND_ORIGIN").map(|o| vec![o.trim().to_string()]))
            .unwrap_or_else(|| DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect());

        Self {
            host: value("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: value("PORT")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(3001),
            environment: value("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            allowed_origins,
            database: DbConfig::from_lookup(&lookup),
            cloudinary: CloudinaryConfig::from_lookup(&lookup),
            auth_secret: value("AUTH_JWT_SECRET"),
            request_timeout: Duration::from_secs(number("REQUEST_TIMEOUT_SECS", 30)),
            max_upload_bytes: number("MAX_UPLOAD_BYTES", 10 * 1024 * 1024) as usize,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key: &str| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]);
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:3001");
        assert!(!config.is_production());
        assert_eq!(config.allowed_origins, DEFAULT_ORIGINS);
        assert!(config.database.is_none());
        assert!(config.cloudinary.is_none());
        assert!(config.auth_secret.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_origins_precedence() {
        let config = load(&[
            ("ALLOWED_ORIGINS", "https://a.example, ,https://b.example"),
            ("FRONTEND_ORIGIN", "https://ignored.example"),
        ]);
        assert_eq!(config.allowed_origins, vec!["https://a.example", "https://b.example"]);

        let config = load(&[("ALLOWED_ORIGINS", " , "), ("FRONTEND_ORIGIN", "https://site.example")]);
        assert_eq!(config.allowed_origins, vec!["https://site.example"]);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("ENVIRONMENT", "production"),
            ("AUTH_JWT_SECRET", "s3cret"),
            ("REQUEST_TIMEOUT_SECS", "5"),
            ("MAX_UPLOAD_BYTES", "bogus"),
            ("DATABASE_URL", "postgres://db/estate"),
        ]);
        assert_eq!(config.port, 8080);
        assert!(config.is_production());
        assert_eq!(config.auth_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.database.unwrap().url, "postgres://db/estate");
    }
}
