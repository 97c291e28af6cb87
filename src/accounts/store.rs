use async_trait::async_trait;
use thiserror::Error;

use super::repo_types::{Account, NewAccount, TransferRecord};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("duplicate {0}")]
    Duplicate(String),

    #[error("database connection error: {0}")]
    Connection(String),

    #[error("database timeout: {0}")]
    Timeout(String),

    #[error("insufficient funds in account {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account_id: i32,
        balance: i64,
        requested: i64,
    },

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub(crate) fn account_not_found(id: i32) -> Self {
        Self::NotFound(format!("account {id}"))
    }
}

// Postgres SQLSTATE codes
const UNIQUE_VIOLATION: &str = "23505";
const QUERY_CANCELED: &str = "57014";
const LOCK_NOT_AVAILABLE: &str = "55P03";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("row".into()),
            sqlx::Error::PoolTimedOut => Self::Timeout("timed out acquiring a connection".into()),
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
                Self::Connection(e.to_string())
            }
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some(UNIQUE_VIOLATION) => Self::Duplicate(
                    db.constraint()
                        .map(str::to_owned)
                        .unwrap_or_else(|| db.message().to_owned()),
                ),
                Some(QUERY_CANCELED) | Some(LOCK_NOT_AVAILABLE) => {
                    Self::Timeout(db.message().to_owned())
                }
                _ => Self::Database(db.message().to_owned()),
            },
            other => Self::Database(other.to_string()),
        }
    }
}

/// Account persistence. Deleting or updating an id that does not exist is
/// `NotFound` in every implementation.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create_account(&self, account: NewAccount) -> StoreResult<Account>;
    async fn delete_account(&self, id: i32) -> StoreResult<()>;
    async fn update_account(&self, account: &Account) -> StoreResult<()>;
    async fn get_account_by_id(&self, id: i32) -> StoreResult<Account>;
    async fn get_account_by_number(&self, number: i64) -> StoreResult<Account>;
    async fn get_accounts(&self) -> StoreResult<Vec<Account>>;

    /// Moves `amount` from `from` to `to` as one unit: either both balances
    /// change or neither does.
    async fn transfer(&self, from: i32, to: i32, amount: i64) -> StoreResult<TransferRecord>;
}
