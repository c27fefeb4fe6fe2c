use async_trait::async_trait;
use bson::{doc, Document};
use mongodb::{Collection, Database};
use tracing::{error, info};

use crate::model::id::Id;
use crate::model::permission::Permission;
use crate::model::staff::Staff;
use crate::repository::mongo::{next_sequence, COUNTERS_COLLECTION};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::repository::staff_permission_dao::STAFF_PERMISSIONS_COLLECTION;

/// Staff accounts and their role grants.
#[async_trait]
pub trait StaffRepository: Send + Sync {
    async fn insert(&self, staff: Staff) -> RepositoryResult<Staff>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Staff>>;
    async fn add_permission(&self, permission: Permission) -> RepositoryResult<Permission>;
}

pub struct MongoStaffRepository {
    collection: Collection<Staff>,
    permissions: Collection<Permission>,
    counters: Collection<Document>,
}

impl MongoStaffRepository {
    pub fn new(db: &Database) -> Self {
        MongoStaffRepository {
            collection: db.collection::<Staff>("staffs"),
            permissions: db.collection::<Permission>(STAFF_PERMISSIONS_COLLECTION),
            counters: db.collection::<Document>(COUNTERS_COLLECTION),
        }
    }
}

#[async_trait]
impl StaffRepository for MongoStaffRepository {
    async fn insert(&self, mut staff: Staff) -> RepositoryResult<Staff> {
        let id = next_sequence(&self.counters, "staffs").await?;
        staff.id = Some(Id::of(id));
        let now = chrono::Local::now().to_rfc3339();
        staff.created_at = Some(now.clone());
        staff.updated_at = Some(now);
        self.collection.insert_one(&staff, None).await.map_err(|e| {
            error!("Failed to insert staff: {}", e);
            RepositoryError::from(e)
        })?;
        info!(staff_id = id, "Staff inserted");
        Ok(staff)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Staff>> {
        let staff = self
            .collection
            .find_one(doc! { "email": email }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find staff by email: {}", e)))?;
        Ok(staff)
    }

    async fn add_permission(&self, mut permission: Permission) -> RepositoryResult<Permission> {
        let id = next_sequence(&self.counters, STAFF_PERMISSIONS_COLLECTION).await?;
        permission.id = Some(Id::of(id));
        self.permissions.insert_one(&permission, None).await?;
        info!(staff_id = %permission.staff_id, role = %permission.role_key, "Permission granted");
        Ok(permission)
    }
}
