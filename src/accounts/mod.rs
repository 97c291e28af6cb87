mod dto;
pub mod handlers;
mod memory;
mod repo;
mod repo_types;
pub mod services;
mod store;

pub use dto::CreateAccountRequest;
pub use memory::MemoryAccountStore;
pub use repo::PgAccountStore;
pub use repo_types::{Account, NewAccount, TransferRecord};
pub use store::{AccountStore, StoreError, StoreResult};

use crate::state::AppState;
use axum::Router;

pub fn router(state: AppState) -> Router<AppState> {
    handlers::account_routes(state)
}
