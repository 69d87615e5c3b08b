use crate::state::AppState;
use axum::Router;

mod claims;
pub(crate) mod cookies;
pub mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use extractors::{require_session, SessionUser};

pub fn api_router() -> Router<AppState> {
    handlers::api_routes()
}

pub fn link_router() -> Router<AppState> {
    handlers::link_routes()
}
