use std::sync::Arc;

use anyhow::Context;

use crate::{
    accounts::{AccountStore, PgAccountStore},
    auth::{jwt::JwtKeys, password::CredentialHasher},
    config::AppConfig,
    db,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AccountStore>,
    pub keys: JwtKeys,
    pub hasher: CredentialHasher,
}

impl AppState {
    /// Connects to Postgres and makes sure the schema exists. Any failure here
    /// must stop the process before it listens.
    pub async fn init(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect(&config.database).await?;
        let store = PgAccountStore::new(pool);
        store.init().await.context("initialize account schema")?;

        let hasher = CredentialHasher::new(&config.hasher).context("argon2 parameters")?;
        Ok(Self::from_parts(
            Arc::new(store),
            JwtKeys::new(&config.jwt),
            hasher,
        ))
    }

    pub fn from_parts(store: Arc<dyn AccountStore>, keys: JwtKeys, hasher: CredentialHasher) -> Self {
        Self {
            store,
            keys,
            hasher,
        }
    }

    #[cfg(test)]
    pub fn in_memory(secret: &str) -> Self {
        use crate::{accounts::MemoryAccountStore, auth::jwt::test_jwt_config};

        Self::from_parts(
            Arc::new(MemoryAccountStore::new()),
            JwtKeys::new(&test_jwt_config(secret)),
            crate::auth::password::fast_hasher(),
        )
    }
}
