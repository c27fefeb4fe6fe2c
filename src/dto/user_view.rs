use serde::Serialize;

use crate::model::user::User;

/// What the detail and list pages see of a user. Carries no password.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub tel: Option<String>,
    pub zip: Option<String>,
    pub address: Option<String>,
    /// `data:` URI of the uploaded image, if any.
    pub image: Option<String>,
    pub image_name: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        let file = user.upload_file.as_ref().filter(|f| !f.is_empty());
        UserView {
            id: user.id.map(|id| id.value()).unwrap_or_default(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            tel: user.tel.clone(),
            zip: user.zip.clone(),
            address: user.address.clone(),
            image: file.map(|f| f.to_data_uri()),
            image_name: file.map(|f| f.original_file_name.clone()),
            created_at: user.created_at.clone(),
            updated_at: user.updated_at.clone(),
        }
    }
}

pub const USER_CSV_HEADERS: [&str; 8] = [
    "id", "first_name", "last_name", "email", "tel", "zip", "address", "created_at",
];

/// One CSV export row. Field order matches `USER_CSV_HEADERS`.
#[derive(Debug, Clone, Serialize)]
pub struct UserCsv {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub tel: String,
    pub zip: String,
    pub address: String,
    pub created_at: String,
}

impl From<&User> for UserCsv {
    fn from(user: &User) -> Self {
        UserCsv {
            id: user.id.map(|id| id.value()).unwrap_or_default(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            tel: user.tel.clone().unwrap_or_default(),
            zip: user.zip.clone().unwrap_or_default(),
            address: user.address.clone().unwrap_or_default(),
            created_at: user.created_at.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::id::Id;
    use crate::model::upload_file::UploadFile;

    #[test]
    fn test_view_hides_password_and_exposes_image() {
        let user = User {
            id: Some(Id::of(3)),
            first_name: "alice".to_string(),
            password: "$argon2id$secret".to_string(),
            upload_file: Some(UploadFile {
                file_name: "f".to_string(),
                original_file_name: "me.png".to_string(),
                content_type: "image/png".to_string(),
                content: vec![1, 2, 3],
            }),
            ..User::default()
        };
        let view = UserView::from(&user);
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("argon2"));
        assert_eq!(view.id, 3);
        assert_eq!(view.image.as_deref(), Some("data:image/png;base64,AQID"));
    }

    #[test]
    fn test_view_without_image() {
        let view = UserView::from(&User::default());
        assert!(view.image.is_none());
    }
}
