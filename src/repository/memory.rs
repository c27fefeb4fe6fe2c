//! Process-local repositories used for tests and `APP_STORAGE=memory`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::model::id::Id;
use crate::model::page::{Page, Pageable};
use crate::model::permission::Permission;
use crate::model::staff::Staff;
use crate::model::user::{User, UserSearch};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::repository::staff_permission_dao::{PermissionStream, StaffPermissionDao};
use crate::repository::staff_repo::StaffRepository;
use crate::repository::user_repo::UserRepository;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn now() -> String {
    chrono::Local::now().to_rfc3339()
}

#[derive(Clone, Debug, Default)]
pub struct MemoryUserRepository {
    users: Arc<Mutex<BTreeMap<i64, User>>>,
    sequence: Arc<AtomicI64>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, mut user: User) -> RepositoryResult<User> {
        let id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        user.id = Some(Id::of(id));
        user.created_at = Some(now());
        user.updated_at = user.created_at.clone();
        lock(&self.users).insert(id, user.clone());
        Ok(user)
    }

    async fn update(&self, mut user: User) -> RepositoryResult<User> {
        let id = user
            .id
            .ok_or_else(|| RepositoryError::validation("Cannot update a user without an id"))?;
        let mut users = lock(&self.users);
        let slot = users
            .get_mut(&id.value())
            .ok_or_else(|| RepositoryError::not_found(format!("No user found to update for ID: {}", id)))?;
        user.updated_at = Some(now());
        *slot = user.clone();
        Ok(user)
    }

    async fn find_by_id(&self, id: Id<User>) -> RepositoryResult<Option<User>> {
        Ok(lock(&self.users).get(&id.value()).cloned())
    }

    async fn find_all(&self, search: &UserSearch, pageable: Pageable) -> RepositoryResult<Page<User>> {
        let users = lock(&self.users);
        let matching: Vec<&User> = users.values().filter(|u| search.matches(u)).collect();
        let count = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(usize::try_from(pageable.offset()).unwrap_or(usize::MAX))
            .take(pageable.per_page as usize)
            .cloned()
            .collect();
        Ok(Page::new(data, count, pageable))
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStaffPermissionDao {
    rows: Arc<Mutex<Vec<Permission>>>,
    sequence: Arc<AtomicI64>,
}

impl MemoryStaffPermissionDao {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, mut permission: Permission) -> Permission {
        let id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        permission.id = Some(Id::of(id));
        lock(&self.rows).push(permission.clone());
        permission
    }
}

#[async_trait]
impl StaffPermissionDao for MemoryStaffPermissionDao {
    async fn stream_by_staff_id(&self, staff_id: Id<Staff>) -> RepositoryResult<PermissionStream> {
        let rows: Vec<RepositoryResult<Permission>> = lock(&self.rows)
            .iter()
            .filter(|p| p.staff_id == staff_id)
            .cloned()
            .map(Ok)
            .collect();
        Ok(stream::iter(rows).boxed())
    }
}

/// Shares its permission rows with the [`MemoryStaffPermissionDao`] it was built from.
#[derive(Clone, Debug)]
pub struct MemoryStaffRepository {
    staff: Arc<Mutex<BTreeMap<i64, Staff>>>,
    sequence: Arc<AtomicI64>,
    permissions: MemoryStaffPermissionDao,
}

impl MemoryStaffRepository {
    pub fn new(permissions: MemoryStaffPermissionDao) -> Self {
        MemoryStaffRepository {
            staff: Arc::default(),
            sequence: Arc::default(),
            permissions,
        }
    }
}

#[async_trait]
impl StaffRepository for MemoryStaffRepository {
    async fn insert(&self, mut staff: Staff) -> RepositoryResult<Staff> {
        let mut all = lock(&self.staff);
        if all.values().any(|s| s.email == staff.email) {
            return Err(RepositoryError::already_exists(format!("Staff with email {} exists", staff.email)));
        }
        let id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        staff.id = Some(Id::of(id));
        staff.created_at = Some(now());
        staff.updated_at = staff.created_at.clone();
        all.insert(id, staff.clone());
        Ok(staff)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Staff>> {
        Ok(lock(&self.staff).values().find(|s| s.email == email).cloned())
    }

    async fn add_permission(&self, permission: Permission) -> RepositoryResult<Permission> {
        Ok(self.permissions.grant(permission))
    }
}
