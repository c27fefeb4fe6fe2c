use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument};

use crate::model::id::Id;
use crate::model::page::{Page, Pageable};
use crate::model::user::{User, UserSearch};
use crate::repository::user_repo::UserRepository;
use crate::util::error::ServiceError;

#[async_trait]
pub trait UserService: Send + Sync {
    async fn find_by_id(&self, id: Id<User>) -> Result<User, ServiceError>;
    async fn find_all(&self, search: &UserSearch, pageable: Pageable) -> Result<Page<User>, ServiceError>;
    /// Persists a new user. The password must already be hashed.
    async fn create(&self, user: User) -> Result<User, ServiceError>;
    async fn update(&self, user: User) -> Result<User, ServiceError>;
}

pub struct UserServiceImpl {
    pub user_repo: Arc<dyn UserRepository>,
}

impl UserServiceImpl {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    #[instrument(skip(self), fields(user_id = %id))]
    async fn find_by_id(&self, id: Id<User>) -> Result<User, ServiceError> {
        match self.user_repo.find_by_id(id).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                info!("User not found");
                Err(ServiceError::NotFound(format!("User {} not found", id)))
            }
            Err(e) => {
                error!("Failed to fetch user: {e}");
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self), fields(page = pageable.page, per_page = pageable.per_page))]
    async fn find_all(&self, search: &UserSearch, pageable: Pageable) -> Result<Page<User>, ServiceError> {
        let page = self.user_repo.find_all(search, pageable).await;
        match &page {
            Ok(p) => info!(count = p.count, "Listed users"),
            Err(e) => error!("Failed to list users: {e}"),
        }
        Ok(page?)
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create(&self, user: User) -> Result<User, ServiceError> {
        info!("Creating user");
        let inserted = self.user_repo.insert(user).await;
        match &inserted {
            Ok(u) => info!(user_id = ?u.id, "User created"),
            Err(e) => error!("Failed to insert user: {e}"),
        }
        Ok(inserted?)
    }

    #[instrument(skip(self, user), fields(user_id = ?user.id))]
    async fn update(&self, user: User) -> Result<User, ServiceError> {
        let id = user
            .id
            .ok_or_else(|| ServiceError::InvalidInput("User id is required for update".to_string()))?;
        // Existence check first so a stale id is a NotFound, not a storage error.
        self.find_by_id(id).await?;
        let updated = self.user_repo.update(user).await;
        match &updated {
            Ok(_) => info!("User updated"),
            Err(e) => error!("Failed to update user: {e}"),
        }
        Ok(updated?)
    }
}
