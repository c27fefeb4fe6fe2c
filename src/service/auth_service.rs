use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::config::AdminUserConfig;
use crate::model::permission::{Permission, ADMIN_ROLE};
use crate::model::staff::Staff;
use crate::repository::staff_repo::StaffRepository;
use crate::util::error::ServiceError;
use crate::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl};
use crate::util::password::{PasswordUtils, PasswordUtilsImpl};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Checks staff credentials and returns a signed access token.
    async fn login(&self, email: &str, password: &str) -> Result<String, ServiceError>;
    /// Creates the configured admin staff with an ADMIN permission unless a
    /// staff with that email already exists. Returns whether one was created.
    async fn bootstrap_admin(&self, config: &AdminUserConfig) -> Result<bool, ServiceError>;
}

pub struct AuthServiceImpl {
    pub staff_repo: Arc<dyn StaffRepository>,
    pub jwt_utils: Arc<JwtTokenUtilsImpl>,
}

impl AuthServiceImpl {
    pub fn new(staff_repo: Arc<dyn StaffRepository>, jwt_utils: Arc<JwtTokenUtilsImpl>) -> Self {
        Self { staff_repo, jwt_utils }
    }
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn login(&self, email: &str, password: &str) -> Result<String, ServiceError> {
        info!("Staff login attempt");
        let staff = match self.staff_repo.find_by_email(email).await {
            Ok(Some(staff)) => staff,
            Ok(None) => {
                warn!("Unknown staff email");
                return Err(ServiceError::InvalidInput(INVALID_CREDENTIALS.to_string()));
            }
            Err(e) => {
                error!("Failed to fetch staff for login: {e}");
                return Err(e.into());
            }
        };
        let valid = PasswordUtilsImpl::verify_password(password, &staff.password)
            .map_err(|e| ServiceError::InternalError(format!("Password verify error: {}", e)))?;
        if !valid {
            warn!("Invalid credentials");
            return Err(ServiceError::InvalidInput(INVALID_CREDENTIALS.to_string()));
        }
        let staff_id = staff
            .id
            .ok_or_else(|| ServiceError::InternalError("Stored staff has no id".to_string()))?;
        self.jwt_utils
            .generate_access_token(staff_id, &staff.email)
            .map_err(|e| ServiceError::InternalError(format!("JWT error: {}", e)))
    }

    #[instrument(skip(self, config), fields(email = %config.email))]
    async fn bootstrap_admin(&self, config: &AdminUserConfig) -> Result<bool, ServiceError> {
        if self.staff_repo.find_by_email(&config.email).await?.is_some() {
            info!("Admin staff already exists, skipping creation.");
            return Ok(false);
        }

        let password = PasswordUtilsImpl::hash_password(&config.password)
            .map_err(|e| ServiceError::InternalError(format!("Password hash error: {}", e)))?;
        let now = Utc::now().to_rfc3339();
        let staff = self
            .staff_repo
            .insert(Staff {
                id: None,
                first_name: config.first_name.clone(),
                last_name: config.last_name.clone(),
                email: config.email.clone(),
                password,
                created_at: Some(now.clone()),
                updated_at: Some(now),
            })
            .await?;
        let staff_id = staff
            .id
            .ok_or_else(|| ServiceError::InternalError("Inserted staff has no id".to_string()))?;

        self.staff_repo
            .add_permission(Permission {
                id: None,
                staff_id,
                role_key: ADMIN_ROLE.to_string(),
                permission_key: "*".to_string(),
                permission_name: "Full access".to_string(),
            })
            .await?;
        info!(%staff_id, "Admin staff created");
        Ok(true)
    }
}
