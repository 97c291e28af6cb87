use anyhow::Context;
use clap::Parser;

use bankapi::{
    accounts::{services::open_account, CreateAccountRequest},
    app::{build_app, serve},
    config::AppConfig,
    state::AppState,
};

#[derive(Debug, Parser)]
#[command(name = "bankapi", about = "Account ledger HTTP service")]
struct Cli {
    /// Create the demo account before serving
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "bankapi=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let state = AppState::init(&config).await?;

    if cli.seed {
        tracing::info!("seeding the database");
        seed_accounts(&state).await?;
    }

    let app = build_app(state);
    serve(app, &config.listen_addr()).await
}

async fn seed_accounts(state: &AppState) -> anyhow::Result<()> {
    let account = open_account(
        state.store.as_ref(),
        &state.hasher,
        CreateAccountRequest {
            first_name: "Nikola".into(),
            last_name: "Jokic".into(),
            password: "bigboatmvp".into(),
        },
    )
    .await
    .context("seed demo account")?;
    tracing::info!(id = account.id, number = account.number, "seeded account");
    Ok(())
}
