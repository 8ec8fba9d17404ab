use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod services;
pub mod validator;

pub fn router() -> Router<AppState> {
    handlers::upload_routes()
}
