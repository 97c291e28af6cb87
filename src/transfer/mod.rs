mod dto;
pub mod handlers;
pub mod services;

pub use dto::TransferRequest;
pub use services::{execute_transfer, TransferError};

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::transfer_routes()
}
