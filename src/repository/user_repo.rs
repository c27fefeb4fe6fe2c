use async_trait::async_trait;
use bson::{doc, Document};
use futures::stream::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::{Collection, Database};
use tracing::{error, info};

use crate::model::id::Id;
use crate::model::page::{Page, Pageable};
use crate::model::user::{User, UserSearch};
use crate::repository::mongo::{next_sequence, prefix_regex, COUNTERS_COLLECTION};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};

/// Data access for users: lookup by id, insert, update and filtered bulk scan.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: User) -> RepositoryResult<User>;
    async fn update(&self, user: User) -> RepositoryResult<User>;
    async fn find_by_id(&self, id: Id<User>) -> RepositoryResult<Option<User>>;
    async fn find_all(&self, search: &UserSearch, pageable: Pageable) -> RepositoryResult<Page<User>>;
}

pub struct MongoUserRepository {
    collection: Collection<User>,
    counters: Collection<Document>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        MongoUserRepository {
            collection: db.collection::<User>("users"),
            counters: db.collection::<Document>(COUNTERS_COLLECTION),
        }
    }

    fn filter(search: &UserSearch) -> Document {
        let mut filter = Document::new();
        if let Some(first_name) = &search.first_name {
            filter.insert("first_name", prefix_regex(first_name));
        }
        if let Some(last_name) = &search.last_name {
            filter.insert("last_name", prefix_regex(last_name));
        }
        if let Some(email) = &search.email {
            filter.insert("email", prefix_regex(email));
        }
        filter
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    #[tracing::instrument(skip(self, user), fields(email = %user.email))]
    async fn insert(&self, mut user: User) -> RepositoryResult<User> {
        let id = next_sequence(&self.counters, "users").await?;
        user.id = Some(Id::of(id));
        let now = chrono::Local::now().to_rfc3339();
        user.created_at = Some(now.clone());
        user.updated_at = Some(now);
        match self.collection.insert_one(&user, None).await {
            Ok(_) => {
                info!(user_id = id, "User inserted");
                Ok(user)
            }
            Err(e) => {
                error!("Failed to insert user: {}", e);
                Err(RepositoryError::from(e))
            }
        }
    }

    #[tracing::instrument(skip(self, user), fields(user_id = ?user.id))]
    async fn update(&self, mut user: User) -> RepositoryResult<User> {
        let id = user
            .id
            .ok_or_else(|| RepositoryError::validation("Cannot update a user without an id"))?;
        user.updated_at = Some(chrono::Local::now().to_rfc3339());
        let result = self
            .collection
            .replace_one(doc! { "_id": id.value() }, &user, None)
            .await?;
        // matched, not modified: an unchanged form is still a successful update
        if result.matched_count == 0 {
            error!("No user found to update for ID: {}", id);
            return Err(RepositoryError::not_found(format!("No user found to update for ID: {}", id)));
        }
        info!("User updated");
        Ok(user)
    }

    async fn find_by_id(&self, id: Id<User>) -> RepositoryResult<Option<User>> {
        let user = self
            .collection
            .find_one(doc! { "_id": id.value() }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find user by id: {}", e)))?;
        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(page = pageable.page, per_page = pageable.per_page))]
    async fn find_all(&self, search: &UserSearch, pageable: Pageable) -> RepositoryResult<Page<User>> {
        let filter = Self::filter(search);
        let count = self.collection.count_documents(filter.clone(), None).await?;
        let options = FindOptions::builder()
            .sort(doc! { "_id": 1 })
            .skip(pageable.offset())
            .limit(i64::from(pageable.per_page))
            .build();
        let users: Vec<User> = self.collection.find(filter, options).await?.try_collect().await?;
        info!("Fetched {} of {} users", users.len(), count);
        Ok(Page::new(users, count, pageable))
    }
}
