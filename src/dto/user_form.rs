use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::model::id::Id;
use crate::model::upload_file::UploadFile;
use crate::model::user::User;

/// Field name -> messages, as rendered next to each input.
pub type FieldErrors = HashMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

/// Registration and edit form. Lives in the form session between the GET and
/// the POST of an edit so a previously chosen image is not lost.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UserForm {
    pub id: Option<Id<User>>,
    #[validate(length(min = 1, max = 50, message = "First name is required (max 50 characters)"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50, message = "Last name is required (max 50 characters)"))]
    pub last_name: String,
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
    #[serde(skip_serializing, default)]
    #[validate(length(max = 100, message = "Password must be at most 100 characters"))]
    pub password: String,
    #[serde(skip_serializing, default)]
    pub password_confirm: String,
    #[validate(length(max = 20, message = "Tel must be at most 20 digits"))]
    pub tel: Option<String>,
    #[validate(length(max = 10, message = "Zip must be at most 10 digits"))]
    pub zip: Option<String>,
    #[validate(length(max = 200, message = "Address must be at most 200 characters"))]
    pub address: Option<String>,
    #[serde(skip)]
    pub user_image: Option<UploadFile>,
    /// Set when the submitted image was over the upload limit and discarded.
    #[serde(skip)]
    pub oversized_image: bool,
}

const MIN_PASSWORD_LENGTH: usize = 4;

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn is_digits(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.chars().all(|c| c.is_ascii_digit()))
}

impl UserForm {
    /// Derived rules plus the cross-field ones: password presence and
    /// confirmation, digits-only tel and zip.
    pub fn validate_for(&self, mode: FormMode) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(e) => e,
        };

        if self.password.is_empty() {
            if mode == FormMode::Create {
                errors.add("password", field_error("required", "Password is required"));
            }
        } else {
            if self.password.chars().count() < MIN_PASSWORD_LENGTH {
                errors.add("password", field_error("length", "Password must be at least 4 characters"));
            }
            if self.password != self.password_confirm {
                errors.add("password_confirm", field_error("mismatch", "Passwords do not match"));
            }
        }
        if !is_digits(&self.tel) {
            errors.add("tel", field_error("digits", "Tel must contain digits only"));
        }
        if !is_digits(&self.zip) {
            errors.add("zip", field_error("digits", "Zip must contain digits only"));
        }
        if self.oversized_image {
            errors.add("user_image", field_error("size", "Image must be at most 2 MB"));
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// New user from a registration form. `password_hash` replaces the plaintext.
    pub fn into_user(self, password_hash: String) -> User {
        User {
            id: None,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            password: password_hash,
            tel: self.tel,
            zip: self.zip,
            address: self.address,
            upload_file: self.user_image,
            created_at: None,
            updated_at: None,
        }
    }

    /// Copies the editable fields onto `user`. Password and image are handled
    /// by the caller.
    pub fn apply_to(&self, user: &mut User) {
        user.first_name = self.first_name.clone();
        user.last_name = self.last_name.clone();
        user.email = self.email.clone();
        user.tel = self.tel.clone();
        user.zip = self.zip.clone();
        user.address = self.address.clone();
    }

    pub fn has_pending_image(&self) -> bool {
        self.user_image.is_some()
    }
}

impl From<&User> for UserForm {
    fn from(user: &User) -> Self {
        UserForm {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            password: String::new(),
            password_confirm: String::new(),
            tel: user.tel.clone(),
            zip: user.zip.clone(),
            address: user.address.clone(),
            user_image: None,
            oversized_image: false,
        }
    }
}

/// Flattens validator output for templates.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| match &e.message {
                    Some(m) => m.to_string(),
                    None => e.code.to_string(),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}
