use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::config::ConfigError;

/// Which backend the repositories talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Mongo,
    Memory,
}

impl FromStr for StorageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StorageKind::Mongo),
            "memory" => Ok(StorageKind::Memory),
            other => Err(ConfigError::InvalidValue(format!("APP_STORAGE: unknown backend '{}'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageKind,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);
        let storage = match env::var("APP_STORAGE") {
            Ok(value) => value.parse()?,
            Err(_) => {
                warn!("APP_STORAGE not set, using default: mongo");
                StorageKind::Mongo
            }
        };
        Ok(AppConfig { host, port, storage })
    }
}
