use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use super::{
    repo_types::{Account, NewAccount, TransferRecord},
    store::{AccountStore, StoreError, StoreResult},
};

const ACCOUNT_COLUMNS: &str =
    "id, first_name, last_name, number, encrypted_password, balance, created_at";

/// Postgres-backed account store.
#[derive(Clone)]
pub struct PgAccountStore {
    db: PgPool,
}

impl PgAccountStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Creates the `account` table if it is missing. Safe to run on every start.
    pub async fn init(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS account (
                id                 SERIAL PRIMARY KEY,
                first_name         VARCHAR(50) NOT NULL,
                last_name          VARCHAR(50) NOT NULL,
                number             BIGINT NOT NULL UNIQUE,
                encrypted_password TEXT NOT NULL CHECK (encrypted_password <> ''),
                balance            BIGINT NOT NULL DEFAULT 0 CHECK (balance >= 0),
                created_at         TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.db)
        .await?;
        debug!("account schema ready");
        Ok(())
    }

    async fn lock_balance(
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
    ) -> StoreResult<i64> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT balance FROM account WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?;
        row.map(|(balance,)| balance)
            .ok_or_else(|| StoreError::account_not_found(id))
    }

    async fn add_to_balance(
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
        delta: i64,
    ) -> StoreResult<i64> {
        let (balance,): (i64,) =
            sqlx::query_as("UPDATE account SET balance = balance + $2 WHERE id = $1 RETURNING balance")
                .bind(id)
                .bind(delta)
                .fetch_one(&mut **tx)
                .await?;
        Ok(balance)
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    #[instrument(skip(self, account), fields(number = account.number))]
    async fn create_account(&self, account: NewAccount) -> StoreResult<Account> {
        let query = format!(
            r#"
            INSERT INTO account (first_name, last_name, number, encrypted_password, balance, created_at)
            VALUES ($1, $2, $3, $4, 0, $5)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, Account>(&query)
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(account.number)
            .bind(&account.encrypted_password)
            .bind(account.created_at)
            .fetch_one(&self.db)
            .await?;
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn delete_account(&self, id: i32) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM account WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::account_not_found(id));
        }
        Ok(())
    }

    #[instrument(skip(self, account), fields(id = account.id))]
    async fn update_account(&self, account: &Account) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE account
               SET first_name = $2, last_name = $3, encrypted_password = $4, balance = $5
             WHERE id = $1
            "#,
        )
        .bind(account.id)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.encrypted_password)
        .bind(account.balance)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::account_not_found(account.id));
        }
        Ok(())
    }

    async fn get_account_by_id(&self, id: i32) -> StoreResult<Account> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = $1");
        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| StoreError::account_not_found(id))
    }

    async fn get_account_by_number(&self, number: i64) -> StoreResult<Account> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE number = $1");
        sqlx::query_as::<_, Account>(&query)
            .bind(number)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("account number {number}")))
    }

    async fn get_accounts(&self) -> StoreResult<Vec<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM account ORDER BY id");
        let rows = sqlx::query_as::<_, Account>(&query)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn transfer(&self, from: i32, to: i32, amount: i64) -> StoreResult<TransferRecord> {
        // Dropping `tx` without commit rolls back, including when the request
        // future is cancelled mid-flight.
        let mut tx = self.db.begin().await?;

        // Lock rows in ascending id order so opposing transfers cannot deadlock.
        let (low, high) = if from < to { (from, to) } else { (to, from) };
        let low_balance = Self::lock_balance(&mut tx, low).await?;
        let high_balance = Self::lock_balance(&mut tx, high).await?;
        let source_balance = if from == low { low_balance } else { high_balance };

        if source_balance < amount {
            return Err(StoreError::InsufficientFunds {
                account_id: from,
                balance: source_balance,
                requested: amount,
            });
        }

        let from_balance = Self::add_to_balance(&mut tx, from, -amount).await?;
        let to_balance = Self::add_to_balance(&mut tx, to, amount).await?;
        tx.commit().await?;

        debug!(from_balance, to_balance, "transfer committed");
        Ok(TransferRecord {
            from_account: from,
            to_account: to,
            amount,
            from_balance,
            to_balance,
        })
    }
}
