//! Transfer flow: a request is received, validated into a `ValidatedTransfer`,
//! then applied by the store in one transaction or rejected as a whole.

use tracing::{info, warn};

use super::dto::TransferRequest;
use crate::accounts::{Account, AccountStore, StoreError, TransferRecord};

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("{0}")]
    Validation(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A transfer that passed validation and may be handed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedTransfer {
    from: i32,
    to: i32,
    amount: i64,
}

impl ValidatedTransfer {
    pub fn new(source: &Account, req: &TransferRequest) -> Result<Self, TransferError> {
        if req.amount <= 0 {
            return Err(TransferError::Validation("amount must be positive"));
        }
        if req.to_account == source.id {
            return Err(TransferError::Validation(
                "source and destination accounts must differ",
            ));
        }
        Ok(Self {
            from: source.id,
            to: req.to_account,
            amount: req.amount,
        })
    }
}

pub async fn execute_transfer(
    store: &dyn AccountStore,
    source: &Account,
    req: &TransferRequest,
) -> Result<TransferRecord, TransferError> {
    let transfer = ValidatedTransfer::new(source, req).inspect_err(|e| {
        warn!(from = source.id, to = req.to_account, error = %e, "transfer rejected");
    })?;

    match store
        .transfer(transfer.from, transfer.to, transfer.amount)
        .await
    {
        Ok(record) => {
            info!(
                from = record.from_account,
                to = record.to_account,
                amount = record.amount,
                "transfer applied"
            );
            Ok(record)
        }
        Err(e) => {
            warn!(from = transfer.from, to = transfer.to, error = %e, "transfer rejected");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::accounts::{MemoryAccountStore, NewAccount};
    use time::OffsetDateTime;

    async fn funded(store: &MemoryAccountStore, number: i64, balance: i64) -> Account {
        let mut account = store
            .create_account(NewAccount {
                first_name: "Test".into(),
                last_name: "Holder".into(),
                number,
                encrypted_password: "$argon2id$v=19$test".into(),
                created_at: OffsetDateTime::now_utc(),
            })
            .await
            .unwrap();
        account.balance = balance;
        store.update_account(&account).await.unwrap();
        account
    }

    fn req(to: i32, amount: i64) -> TransferRequest {
        TransferRequest {
            to_account: to,
            amount,
        }
    }

    #[tokio::test]
    async fn applies_and_conserves_total() {
        let store = MemoryAccountStore::new();
        let a = funded(&store, 1, 100).await;
        let b = funded(&store, 2, 0).await;

        let record = execute_transfer(&store, &a, &req(b.id, 40)).await.unwrap();
        assert_eq!(record.from_balance, 60);
        assert_eq!(record.to_balance, 40);
        assert_eq!(store.get_account_by_id(a.id).await.unwrap().balance, 60);
        assert_eq!(store.get_account_by_id(b.id).await.unwrap().balance, 40);
    }

    #[tokio::test]
    async fn whole_balance_can_move() {
        let store = MemoryAccountStore::new();
        let a = funded(&store, 1, 25).await;
        let b = funded(&store, 2, 0).await;
        let record = execute_transfer(&store, &a, &req(b.id, 25)).await.unwrap();
        assert_eq!((record.from_balance, record.to_balance), (0, 25));
    }

    #[tokio::test]
    async fn insufficient_funds_changes_nothing() {
        let store = MemoryAccountStore::new();
        let a = funded(&store, 1, 10).await;
        let b = funded(&store, 2, 3).await;

        let err = execute_transfer(&store, &a, &req(b.id, 11)).await.unwrap_err();
        assert!(matches!(
            err,
            TransferError::Store(StoreError::InsufficientFunds { .. })
        ));
        assert_eq!(store.get_account_by_id(a.id).await.unwrap().balance, 10);
        assert_eq!(store.get_account_by_id(b.id).await.unwrap().balance, 3);
    }

    #[tokio::test]
    async fn rejects_invalid_requests_before_touching_store() {
        let store = MemoryAccountStore::new();
        let a = funded(&store, 1, 10).await;
        let b = funded(&store, 2, 0).await;

        for bad in [req(b.id, 0), req(b.id, -5), req(a.id, 1)] {
            let err = execute_transfer(&store, &a, &bad).await.unwrap_err();
            assert!(matches!(err, TransferError::Validation(_)));
        }
        assert_eq!(store.get_account_by_id(a.id).await.unwrap().balance, 10);
    }

    #[tokio::test]
    async fn missing_destination_is_not_found() {
        let store = MemoryAccountStore::new();
        let a = funded(&store, 1, 10).await;
        let err = execute_transfer(&store, &a, &req(77, 1)).await.unwrap_err();
        assert!(matches!(err, TransferError::Store(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn simultaneous_opposing_transfers_net_to_zero() {
        let store = Arc::new(MemoryAccountStore::new());
        let a = funded(&store, 1, 50).await;
        let b = funded(&store, 2, 50).await;

        let (s1, s2) = (store.clone(), store.clone());
        let (a1, b1) = (a.clone(), b.clone());
        let ab = tokio::spawn(async move { execute_transfer(s1.as_ref(), &a1, &req(b1.id, 20)).await });
        let ba = tokio::spawn(async move { execute_transfer(s2.as_ref(), &b, &req(a.id, 20)).await });
        ab.await.unwrap().unwrap();
        ba.await.unwrap().unwrap();

        let balances: Vec<i64> = store
            .get_accounts()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.balance)
            .collect();
        assert_eq!(balances, vec![50, 50]);
    }
}
