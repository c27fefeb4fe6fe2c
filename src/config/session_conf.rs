use std::env;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ConfigError;

/// Lifetime and size limits of the per-browser form sessions.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl_minutes: u64,
    /// Live sessions kept at most; the least recently written are evicted first.
    pub max_sessions: usize,
    /// Total bytes of pending images held across all sessions.
    pub max_pending_bytes: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(format!("{}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

impl SessionConfig {
    /// Reads `SESSION_TTL_MINUTES` (30), `SESSION_MAX_ENTRIES` (1000) and
    /// `SESSION_MAX_PENDING_MB` (64).
    pub fn from_env() -> Result<Self, ConfigError> {
        if env::var("SESSION_TTL_MINUTES").is_err() {
            warn!("SESSION_TTL_MINUTES not set, using default: 30 minutes");
        }
        let ttl_minutes = env_or("SESSION_TTL_MINUTES", 30u64)?;
        let max_sessions = env_or("SESSION_MAX_ENTRIES", 1000usize)?;
        let max_pending_mb = env_or("SESSION_MAX_PENDING_MB", 64usize)?;
        debug!(
            "Session TTL: {} minutes, max {} sessions, {} MB pending images",
            ttl_minutes, max_sessions, max_pending_mb
        );

        let config = SessionConfig {
            ttl_minutes,
            max_sessions,
            max_pending_bytes: max_pending_mb.saturating_mul(1024 * 1024),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_minutes == 0 {
            return Err(ConfigError::ValidationError("Session TTL must be greater than 0".to_string()));
        }
        if self.max_sessions == 0 {
            return Err(ConfigError::ValidationError("SESSION_MAX_ENTRIES must be greater than 0".to_string()));
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes * 60)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            ttl_minutes: 30,
            max_sessions: 1000,
            max_pending_bytes: 64 * 1024 * 1024,
        }
    }
}
