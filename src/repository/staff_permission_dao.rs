use async_trait::async_trait;
use bson::doc;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use mongodb::{Collection, Database};
use tracing::debug;

use crate::model::id::Id;
use crate::model::permission::Permission;
use crate::model::staff::Staff;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};

pub const STAFF_PERMISSIONS_COLLECTION: &str = "staff_permissions";

pub type PermissionStream = BoxStream<'static, RepositoryResult<Permission>>;

/// Read access to the permissions granted to a staff member.
///
/// Backends only produce the row stream; `select_by_staff_id` folds it.
#[async_trait]
pub trait StaffPermissionDao: Send + Sync {
    async fn stream_by_staff_id(&self, staff_id: Id<Staff>) -> RepositoryResult<PermissionStream>;
}

impl dyn StaffPermissionDao {
    /// Streams the staff member's permission rows through `reducer`, starting
    /// from `init`. No rows yields `init` unchanged.
    pub async fn select_by_staff_id<R, F>(&self, staff_id: Id<Staff>, init: R, mut reducer: F) -> RepositoryResult<R>
    where
        F: FnMut(R, Permission) -> R,
    {
        let mut rows = self.stream_by_staff_id(staff_id).await?;
        let mut acc = init;
        while let Some(row) = rows.next().await {
            acc = reducer(acc, row?);
        }
        Ok(acc)
    }
}

pub struct MongoStaffPermissionDao {
    collection: Collection<Permission>,
}

impl MongoStaffPermissionDao {
    pub fn new(db: &Database) -> Self {
        MongoStaffPermissionDao {
            collection: db.collection::<Permission>(STAFF_PERMISSIONS_COLLECTION),
        }
    }
}

#[async_trait]
impl StaffPermissionDao for MongoStaffPermissionDao {
    async fn stream_by_staff_id(&self, staff_id: Id<Staff>) -> RepositoryResult<PermissionStream> {
        debug!(%staff_id, "Selecting staff permissions");
        let cursor = self
            .collection
            .find(doc! { "staff_id": staff_id.value() }, None)
            .await?;
        Ok(cursor.map_err(RepositoryError::from).boxed())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::stream;

    use super::*;

    /// Yields one ADMIN row, then loses the connection.
    struct DroppingDao;

    #[async_trait]
    impl StaffPermissionDao for DroppingDao {
        async fn stream_by_staff_id(&self, staff_id: Id<Staff>) -> RepositoryResult<PermissionStream> {
            let row = Permission {
                id: Some(Id::of(1)),
                staff_id,
                role_key: "ADMIN".to_string(),
                permission_key: "users".to_string(),
                permission_name: "Users".to_string(),
            };
            Ok(stream::iter(vec![Ok(row), Err(RepositoryError::connection("cursor lost"))]).boxed())
        }
    }

    #[tokio::test]
    async fn test_error_mid_stream_fails_the_select() {
        let dao: Arc<dyn StaffPermissionDao> = Arc::new(DroppingDao);
        let mut seen = 0;
        let result = dao
            .select_by_staff_id(Id::of(7), Vec::new(), |mut roles, p| {
                seen += 1;
                roles.push(p.role_key);
                roles
            })
            .await;

        assert_eq!(seen, 1);
        match result {
            Err(RepositoryError::ConnectionError(msg)) => assert_eq!(msg, "cursor lost"),
            other => panic!("expected a connection error, got {:?}", other),
        }
    }
}
