pub mod auth;
pub mod authorize;

pub use auth::{auth_middleware, AuthUser, CurrentUser};
pub use authorize::authorize_middleware;
