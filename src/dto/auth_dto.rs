use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
    #[serde(skip_serializing, default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}
