pub mod auth;

pub use auth::{auth_middleware, is_admin, require_admin, AppState, AuthUser};
