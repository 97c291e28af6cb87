use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub statement_timeout_secs: u64,
}

/// Argon2 cost parameters. `None` keeps the argon2 crate default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HasherConfig {
    pub memory_kib: Option<u32>,
    pub iterations: Option<u32>,
    pub parallelism: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub hasher: HasherConfig,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: env_or("DB_MAX_CONNECTIONS", 10)?,
            acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", 5)?,
            statement_timeout_secs: env_or("DB_STATEMENT_TIMEOUT_SECS", 5)?,
        };

        let jwt = jwt_from_parts(
            std::env::var("JWT_SECRET").ok(),
            std::env::var("JWT_ISSUER").unwrap_or_else(|_| "bankapi".into()),
            std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "bankapi-clients".into()),
            env_or("JWT_TTL_MINUTES", 60)?,
        )?;

        let hasher = HasherConfig {
            memory_kib: env_opt("ARGON2_MEMORY_KIB")?,
            iterations: env_opt("ARGON2_ITERATIONS")?,
            parallelism: env_opt("ARGON2_PARALLELISM")?,
        };

        Ok(Self {
            database,
            jwt,
            hasher,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 3000)?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn jwt_from_parts(
    secret: Option<String>,
    issuer: String,
    audience: String,
    ttl_minutes: i64,
) -> anyhow::Result<JwtConfig> {
    let secret = secret.context("JWT_SECRET must be set")?;
    if secret.trim().is_empty() {
        bail!("JWT_SECRET must not be empty");
    }
    if ttl_minutes <= 0 {
        bail!("JWT_TTL_MINUTES must be positive, got {ttl_minutes}");
    }
    Ok(JwtConfig {
        secret,
        issuer,
        audience,
        ttl_minutes,
    })
}

fn env_opt<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => {
            let parsed = v
                .trim()
                .parse::<T>()
                .with_context(|| format!("{key} has an invalid value: {v:?}"))?;
            Ok(Some(parsed))
        }
        Err(_) => Ok(None),
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(env_opt(key)?.unwrap_or(default))
}
