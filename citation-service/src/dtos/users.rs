use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::UserFlags;
use crate::utils::validation::validate_username;

/// No `Debug`: the struct holds a plaintext password.
#[derive(Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(custom(function = "validate_username", message = "Invalid username"))]
    #[schema(example = "alice", min_length = 3, max_length = 50)]
    pub username: String,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 100, message = "Email is too long")
    )]
    #[schema(example = "alice@example.com")]
    pub email: String,

    #[validate(length(max = 100, message = "Full name is too long"))]
    #[schema(example = "Alice Liddell")]
    pub full_name: Option<String>,

    #[validate(length(max = 128, message = "Password is too long"))]
    #[schema(example = "Str0ng!Pass")]
    pub password: String,
}

/// OAuth2 password grant form. `grant_type` and `scope` are accepted and
/// ignored.
#[derive(Deserialize, ToSchema)]
pub struct LoginForm {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "Str0ng!Pass")]
    pub password: String,
    pub grant_type: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserFlagsRequest {
    pub disabled: Option<bool>,
    pub is_admin: Option<bool>,
}

impl From<UpdateUserFlagsRequest> for UserFlags {
    fn from(req: UpdateUserFlagsRequest) -> Self {
        UserFlags {
            disabled: req.disabled,
            is_admin: req.is_admin,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletedUserResponse {
    pub id: i64,
    pub username: String,
}
