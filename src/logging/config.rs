use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// How the subscriber is assembled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LogLevel,
    /// JSON lines instead of the pretty console format
    pub json: bool,
    pub directory: String,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Production logs JSON at `info`, everything else pretty at `debug`.
    /// `LOG_LEVEL` and `LOG_DIR` override.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let is_production = lookup("ENVIRONMENT").as_deref() == Some("production");
        let fallback = if is_production {
            LogLevel::Info
        } else {
            LogLevel::Debug
        };

        Self {
            level: lookup("LOG_LEVEL")
                .and_then(|s| s.parse().ok())
                .unwrap_or(fallback),
            json: is_production,
            directory: lookup("LOG_DIR")
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "logs".to_string()),
        }
    }

    /// Directive used when `RUST_LOG` is not set.
    pub fn default_directive(&self) -> String {
        format!("estate_cms={},tower_http=debug,axum=debug", self.level)
    }
}
