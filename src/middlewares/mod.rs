pub mod auth;

pub use auth::{AuthUser, RequireAdmin, require_auth};
