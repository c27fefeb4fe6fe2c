//! Shared MongoDB plumbing for the concrete repositories.

use bson::{doc, Document};
use mongodb::options::{ClientOptions, Credential, FindOneAndUpdateOptions, ReturnDocument};
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

use crate::config::mongo_conf::MongoConfig;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};

pub const COUNTERS_COLLECTION: &str = "counters";

/// Opens a client with the pool settings from `config` and returns its database handle.
pub async fn connect(config: &MongoConfig) -> Result<Database, mongodb::error::Error> {
    let mut client_options = ClientOptions::parse(&config.uri).await?;
    client_options.app_name = Some("UserAdminBackend".to_string());
    client_options.max_pool_size = Some(config.pool_size);
    client_options.connect_timeout = Some(std::time::Duration::from_secs(config.connection_timeout_secs));
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        client_options.credential = Some(
            Credential::builder()
                .username(username.clone())
                .password(password.clone())
                .build(),
        );
    }
    let client = Client::with_options(client_options)?;
    info!(database = %config.database, "Connected MongoDB client");
    Ok(client.database(&config.database))
}

/// Atomically increments the named counter and returns the new value.
/// Numeric ids come from here since Mongo only generates ObjectIds.
pub async fn next_sequence(counters: &Collection<Document>, name: &str) -> RepositoryResult<i64> {
    let options = FindOneAndUpdateOptions::builder()
        .upsert(true)
        .return_document(ReturnDocument::After)
        .build();
    let counter = counters
        .find_one_and_update(doc! { "_id": name }, doc! { "$inc": { "seq": 1_i64 } }, options)
        .await?
        .ok_or_else(|| RepositoryError::database(format!("Counter '{}' was not created", name)))?;
    let seq = counter.get_i64("seq")?;
    debug!(counter = name, seq, "Allocated sequence value");
    Ok(seq)
}

/// Anchored, case-insensitive prefix match for a user-supplied string.
pub fn prefix_regex(value: &str) -> Document {
    let mut pattern = String::with_capacity(value.len() + 1);
    pattern.push('^');
    for c in value.chars() {
        if "\\.^$|?*+()[]{}-/".contains(c) {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    doc! { "$regex": pattern, "$options": "i" }
}
