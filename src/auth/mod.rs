use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
pub mod extractors;
pub mod gate;
pub mod handlers;
pub mod jwt;
pub mod password;

pub use claims::Claims;

/// Header carrying the bearer token.
pub const TOKEN_HEADER: &str = "x-jwt-token";

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
