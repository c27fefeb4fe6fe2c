use serde::{Deserialize, Serialize};

use crate::model::id::Id;
use crate::model::upload_file::UploadFile;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<Id<User>>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Argon2 PHC string, never plaintext.
    pub password: String,
    pub tel: Option<String>,
    pub zip: Option<String>,
    pub address: Option<String>,
    pub upload_file: Option<UploadFile>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Search criteria for the user list. Every populated field is a
/// case-insensitive prefix match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSearch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl UserSearch {
    pub fn matches(&self, user: &User) -> bool {
        fn prefix(criterion: &Option<String>, value: &str) -> bool {
            match criterion {
                Some(c) => value.to_lowercase().starts_with(&c.to_lowercase()),
                None => true,
            }
        }
        prefix(&self.first_name, &user.first_name)
            && prefix(&self.last_name, &user.last_name)
            && prefix(&self.email, &user.email)
    }
}
