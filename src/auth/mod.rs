use crate::state::AppState;
use axum::Router;

mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use extractors::{require_role, CurrentUser, OptionalUser};
pub use repo_types::{Role, User};

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
