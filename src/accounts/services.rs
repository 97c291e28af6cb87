use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};

use super::{
    dto::CreateAccountRequest,
    repo_types::{Account, NewAccount},
    store::{AccountStore, StoreError},
};
use crate::{auth::password::CredentialHasher, error::AppError};

pub const MAX_ACCOUNT_NUMBER: i64 = 99_999;
const NUMBER_ATTEMPTS: u32 = 8;

pub(crate) fn is_valid_name(name: &str) -> bool {
    lazy_static! {
        static ref NAME_RE: Regex =
            Regex::new(r"^[\p{L}\p{M}][\p{L}\p{M}\p{N} .'\-]{0,49}$").unwrap();
    }
    NAME_RE.is_match(name)
}

pub fn generate_account_number() -> i64 {
    rand::thread_rng().gen_range(0..=MAX_ACCOUNT_NUMBER)
}

/// Validates the request, hashes the password and persists the account.
/// Nothing is stored unless hashing succeeded.
pub async fn open_account(
    store: &dyn AccountStore,
    hasher: &CredentialHasher,
    req: CreateAccountRequest,
) -> Result<Account, AppError> {
    open_account_with(store, hasher, req, generate_account_number).await
}

pub(crate) async fn open_account_with(
    store: &dyn AccountStore,
    hasher: &CredentialHasher,
    req: CreateAccountRequest,
    mut next_number: impl FnMut() -> i64 + Send,
) -> Result<Account, AppError> {
    let first_name = req.first_name.trim().to_owned();
    let last_name = req.last_name.trim().to_owned();
    if !is_valid_name(&first_name) {
        return Err(AppError::Validation("invalid first name".into()));
    }
    if !is_valid_name(&last_name) {
        return Err(AppError::Validation("invalid last name".into()));
    }
    if req.password.is_empty() {
        return Err(AppError::Validation("password must not be empty".into()));
    }

    let encrypted_password = hasher.hash_blocking(req.password).await?;
    let created_at = OffsetDateTime::now_utc();

    // The store enforces number uniqueness; draw again on collision.
    for attempt in 1..=NUMBER_ATTEMPTS {
        let new_account = NewAccount {
            first_name: first_name.clone(),
            last_name: last_name.clone(),
            number: next_number(),
            encrypted_password: encrypted_password.clone(),
            created_at,
        };
        match store.create_account(new_account).await {
            Ok(account) => {
                info!(id = account.id, number = account.number, "account opened");
                return Ok(account);
            }
            Err(StoreError::Duplicate(what)) => {
                warn!(attempt, %what, "account number collision");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(StoreError::Duplicate("account number, retries exhausted".into()).into())
}
