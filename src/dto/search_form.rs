use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::page::{Pageable, DEFAULT_PAGE_SIZE};
use crate::model::user::UserSearch;

/// Query-string (GET) and urlencoded body (POST) of the user search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SearchUserForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 50, message = "First name must be at most 50 characters"))]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 50, message = "Last name must be at most 50 characters"))]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100, message = "Email must be at most 100 characters"))]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl SearchUserForm {
    /// Same filters with blank criteria dropped and no page.
    pub fn normalized(&self) -> SearchUserForm {
        SearchUserForm {
            first_name: trimmed(&self.first_name),
            last_name: trimmed(&self.last_name),
            email: trimmed(&self.email),
            page: None,
        }
    }

    pub fn to_search(&self) -> UserSearch {
        let form = self.normalized();
        UserSearch {
            first_name: form.first_name,
            last_name: form.last_name,
            email: form.email,
        }
    }

    pub fn pageable(&self) -> Pageable {
        Pageable::new(self.page.unwrap_or(1), DEFAULT_PAGE_SIZE)
    }

    /// Canonical GET URL for these filters, optionally on a given page.
    pub fn to_url(&self, page: Option<u32>) -> String {
        let mut form = self.normalized();
        form.page = page.filter(|p| *p > 1);
        match serde_urlencoded::to_string(&form) {
            Ok(qs) if !qs.is_empty() => format!("/users/find?{}", qs),
            _ => "/users/find".to_string(),
        }
    }
}
