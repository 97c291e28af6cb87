use std::{str::FromStr, time::Duration};

use anyhow::Context;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use tracing::info;

use crate::config::DatabaseConfig;

/// Opens the pool. Every connection carries a `statement_timeout` so no
/// query can hold a request worker indefinitely.
pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let statement_timeout = format!("{}s", cfg.statement_timeout_secs);
    let options = PgConnectOptions::from_str(&cfg.url)
        .context("parse DATABASE_URL")?
        .options([("statement_timeout", statement_timeout.as_str())]);

    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .connect_with(options)
        .await
        .context("connect to database")?;

    info!(
        max_connections = cfg.max_connections,
        statement_timeout_secs = cfg.statement_timeout_secs,
        "database pool ready"
    );
    Ok(pool)
}
