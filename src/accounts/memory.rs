use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{
    repo_types::{Account, NewAccount, TransferRecord},
    store::{AccountStore, StoreError, StoreResult},
};

struct MemoryData {
    accounts: BTreeMap<i32, Account>, // id -> account
    next_id: i32,
}

/// In-memory account store. Every operation runs under one lock, which makes
/// transfers trivially atomic.
pub struct MemoryAccountStore {
    data: Mutex<MemoryData>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(MemoryData {
                accounts: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }
}

// Same CHECK constraints as the account table.
fn check_row(encrypted_password: &str, balance: i64) -> StoreResult<()> {
    if encrypted_password.is_empty() {
        return Err(StoreError::Database(
            "new row violates check constraint \"account_encrypted_password_check\"".into(),
        ));
    }
    if balance < 0 {
        return Err(StoreError::Database(
            "new row violates check constraint \"account_balance_check\"".into(),
        ));
    }
    Ok(())
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn create_account(&self, account: NewAccount) -> StoreResult<Account> {
        check_row(&account.encrypted_password, 0)?;
        let mut data = self.data.lock().await;
        if data.accounts.values().any(|a| a.number == account.number) {
            return Err(StoreError::Duplicate("account_number_key".into()));
        }
        let id = data.next_id;
        data.next_id += 1;
        let created = Account {
            id,
            first_name: account.first_name,
            last_name: account.last_name,
            number: account.number,
            encrypted_password: account.encrypted_password,
            balance: 0,
            created_at: account.created_at,
        };
        data.accounts.insert(id, created.clone());
        debug!(id, "account stored in memory");
        Ok(created)
    }

    async fn delete_account(&self, id: i32) -> StoreResult<()> {
        let mut data = self.data.lock().await;
        data.accounts
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::account_not_found(id))
    }

    async fn update_account(&self, account: &Account) -> StoreResult<()> {
        let mut data = self.data.lock().await;
        let stored = data
            .accounts
            .get_mut(&account.id)
            .ok_or_else(|| StoreError::account_not_found(account.id))?;
        check_row(&account.encrypted_password, account.balance)?;
        stored.first_name = account.first_name.clone();
        stored.last_name = account.last_name.clone();
        stored.encrypted_password = account.encrypted_password.clone();
        stored.balance = account.balance;
        Ok(())
    }

    async fn get_account_by_id(&self, id: i32) -> StoreResult<Account> {
        let data = self.data.lock().await;
        data.accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::account_not_found(id))
    }

    async fn get_account_by_number(&self, number: i64) -> StoreResult<Account> {
        let data = self.data.lock().await;
        data.accounts
            .values()
            .find(|a| a.number == number)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("account number {number}")))
    }

    async fn get_accounts(&self) -> StoreResult<Vec<Account>> {
        let data = self.data.lock().await;
        Ok(data.accounts.values().cloned().collect())
    }

    async fn transfer(&self, from: i32, to: i32, amount: i64) -> StoreResult<TransferRecord> {
        let mut data = self.data.lock().await;
        let source_balance = data
            .accounts
            .get(&from)
            .map(|a| a.balance)
            .ok_or_else(|| StoreError::account_not_found(from))?;
        let dest_balance = data
            .accounts
            .get(&to)
            .map(|a| a.balance)
            .ok_or_else(|| StoreError::account_not_found(to))?;
        if source_balance < amount {
            return Err(StoreError::InsufficientFunds {
                account_id: from,
                balance: source_balance,
                requested: amount,
            });
        }

        let from_balance = source_balance - amount;
        let to_balance = dest_balance
            .checked_add(amount)
            .ok_or_else(|| StoreError::Database("bigint out of range".into()))?;
        for (id, balance) in [(from, from_balance), (to, to_balance)] {
            if let Some(account) = data.accounts.get_mut(&id) {
                account.balance = balance;
            }
        }

        Ok(TransferRecord {
            from_account: from,
            to_account: to,
            amount,
            from_balance,
            to_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use time::OffsetDateTime;

    fn new_account(number: i64) -> NewAccount {
        NewAccount {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            number,
            encrypted_password: "$argon2id$v=19$test".into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    async fn funded(store: &MemoryAccountStore, number: i64, balance: i64) -> Account {
        let mut account = store.create_account(new_account(number)).await.unwrap();
        account.balance = balance;
        store.update_account(&account).await.unwrap();
        account
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids_and_zero_balance() {
        let store = MemoryAccountStore::new();
        let a = store.create_account(new_account(1)).await.unwrap();
        let b = store.create_account(new_account(2)).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(a.balance, 0);
    }

    #[tokio::test]
    async fn duplicate_number_is_rejected() {
        let store = MemoryAccountStore::new();
        store.create_account(new_account(77)).await.unwrap();
        let err = store.create_account(new_account(77)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn get_accounts_is_empty_not_error() {
        let store = MemoryAccountStore::new();
        assert!(store.get_accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let store = MemoryAccountStore::new();
        assert!(matches!(
            store.get_account_by_id(9).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_account(9).await,
            Err(StoreError::NotFound(_))
        ));
        let mut ghost = funded(&store, 5, 0).await;
        ghost.id = 99;
        assert!(matches!(
            store.update_account(&ghost).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_replaces_mutable_fields_only() {
        let store = MemoryAccountStore::new();
        let mut a = funded(&store, 5, 0).await;
        a.first_name = "Grace".into();
        a.number = 6;
        a.balance = 50;
        store.update_account(&a).await.unwrap();
        let stored = store.get_account_by_id(a.id).await.unwrap();
        assert_eq!(stored.first_name, "Grace");
        assert_eq!(stored.balance, 50);
        assert_eq!(stored.number, 5);
    }

    #[tokio::test]
    async fn empty_password_hash_is_rejected() {
        let store = MemoryAccountStore::new();
        let mut account = new_account(3);
        account.encrypted_password = String::new();
        let err = store.create_account(account).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(ref m) if m.contains("check constraint")));
        assert!(store.get_accounts().await.unwrap().is_empty());

        let mut stored = funded(&store, 4, 0).await;
        stored.encrypted_password = String::new();
        assert!(matches!(
            store.update_account(&stored).await,
            Err(StoreError::Database(_))
        ));
    }

    #[tokio::test]
    async fn negative_balance_is_rejected_on_update() {
        let store = MemoryAccountStore::new();
        let mut a = funded(&store, 1, 20).await;
        a.balance = -50;
        let err = store.update_account(&a).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(ref m) if m.contains("check constraint")));
        assert_eq!(store.get_account_by_id(a.id).await.unwrap().balance, 20);
    }

    #[tokio::test]
    async fn credit_overflow_is_an_error() {
        let store = MemoryAccountStore::new();
        let a = funded(&store, 1, 10).await;
        let b = funded(&store, 2, i64::MAX).await;

        let err = store.transfer(a.id, b.id, 5).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
        assert_eq!(store.get_account_by_id(a.id).await.unwrap().balance, 10);
        assert_eq!(store.get_account_by_id(b.id).await.unwrap().balance, i64::MAX);
    }

    #[tokio::test]
    async fn transfer_conserves_total_balance() {
        let store = MemoryAccountStore::new();
        let a = funded(&store, 1, 100).await;
        let b = funded(&store, 2, 5).await;

        let record = store.transfer(a.id, b.id, 30).await.unwrap();
        assert_eq!(record.from_balance, 70);
        assert_eq!(record.to_balance, 35);

        let total: i64 = store
            .get_accounts()
            .await
            .unwrap()
            .iter()
            .map(|a| a.balance)
            .sum();
        assert_eq!(total, 105);
    }

    #[tokio::test]
    async fn overdraft_leaves_balances_untouched() {
        let store = MemoryAccountStore::new();
        let a = funded(&store, 1, 10).await;
        let b = funded(&store, 2, 0).await;

        let err = store.transfer(a.id, b.id, 11).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientFunds { balance: 10, requested: 11, .. }
        ));
        assert_eq!(store.get_account_by_id(a.id).await.unwrap().balance, 10);
        assert_eq!(store.get_account_by_id(b.id).await.unwrap().balance, 0);
    }

    #[tokio::test]
    async fn transfer_to_missing_account_applies_nothing() {
        let store = MemoryAccountStore::new();
        let a = funded(&store, 1, 10).await;
        let err = store.transfer(a.id, 42, 5).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.get_account_by_id(a.id).await.unwrap().balance, 10);
    }

    #[tokio::test]
    async fn opposing_concurrent_transfers_net_to_zero() {
        let store = Arc::new(MemoryAccountStore::new());
        let a = funded(&store, 1, 100).await;
        let b = funded(&store, 2, 100).await;

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            let (from, to) = if i % 2 == 0 { (a.id, b.id) } else { (b.id, a.id) };
            handles.push(tokio::spawn(
                async move { store.transfer(from, to, 10).await },
            ));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(store.get_account_by_id(a.id).await.unwrap().balance, 100);
        assert_eq!(store.get_account_by_id(b.id).await.unwrap().balance, 100);
    }
}
