//! Admit/deny decision for identity-scoped requests.
//!
//! Every check funnels into one `Admission`; callers turn `Deny` into the same
//! 403 no matter which step failed. The failing step is only logged.

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::jwt::JwtKeys;
use crate::{
    accounts::{Account, AccountStore},
    error::AppError,
    state::AppState,
};

/// Whose identity the token has to prove.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// Raw `{id}` path segment of the requested account.
    AccountPath(&'a str),
    /// Whoever holds the token, resolved through its account number.
    TokenHolder,
}

#[derive(Debug)]
pub enum Admission {
    Admit(Account),
    Deny,
}

pub async fn authorize(
    keys: &JwtKeys,
    store: &dyn AccountStore,
    token: Option<&str>,
    target: Target<'_>,
) -> Admission {
    match check(keys, store, token, target).await {
        Ok(account) => {
            debug!(id = account.id, "request admitted");
            Admission::Admit(account)
        }
        Err(step) => {
            warn!(step, "request denied");
            Admission::Deny
        }
    }
}

async fn check(
    keys: &JwtKeys,
    store: &dyn AccountStore,
    token: Option<&str>,
    target: Target<'_>,
) -> Result<Account, &'static str> {
    let token = token.ok_or("missing token")?;
    let claims = keys.validate(token).map_err(|_| "token validation")?;

    let account = match target {
        Target::AccountPath(raw) => {
            let id = raw.parse::<i32>().map_err(|_| "target id")?;
            store
                .get_account_by_id(id)
                .await
                .map_err(|_| "account lookup")?
        }
        Target::TokenHolder => store
            .get_account_by_number(claims.account_number)
            .await
            .map_err(|_| "account lookup")?,
    };

    if account.number != claims.account_number {
        return Err("account number mismatch");
    }
    Ok(account)
}

/// Route layer for `/account/:id`: the token must belong to the account in the path.
pub async fn require_account_token(
    State(state): State<AppState>,
    path: Option<Path<String>>,
    req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(super::TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let raw_id = path.map(|Path(id)| id).unwrap_or_default();

    let admission = authorize(
        &state.keys,
        state.store.as_ref(),
        token.as_deref(),
        Target::AccountPath(&raw_id),
    )
    .await;

    match admission {
        Admission::Admit(_) => next.run(req).await,
        Admission::Deny => AppError::Forbidden.into_response(),
    }
}
