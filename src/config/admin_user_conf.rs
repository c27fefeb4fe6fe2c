use std::env;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Credentials of the staff account created on first start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUserConfig {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl AdminUserConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        fn required(key: &str) -> Result<String, ConfigError> {
            env::var(key).map_err(|_| ConfigError::EnvVarNotFound(key.to_string()))
        }

        let config = AdminUserConfig {
            first_name: required("ADMIN_FIRST_NAME")?,
            last_name: required("ADMIN_LAST_NAME")?,
            email: required("ADMIN_EMAIL")?,
            password: required("ADMIN_PASSWORD")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.email.contains('@') {
            return Err(ConfigError::ValidationError("ADMIN_EMAIL must be an email address".to_string()));
        }
        if self.password.len() < 8 {
            return Err(ConfigError::ValidationError("ADMIN_PASSWORD must be at least 8 characters long".to_string()));
        }
        Ok(())
    }
}
