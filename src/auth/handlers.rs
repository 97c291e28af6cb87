use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::dto::{LoginRequest, LoginResponse},
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Unknown number and wrong password are indistinguishable to the caller.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(req) = payload?;

    let account = match state.store.get_account_by_number(req.number).await {
        Ok(a) => a,
        Err(e) => {
            warn!(number = req.number, error = %e, "login lookup failed");
            return Err(AppError::Forbidden);
        }
    };

    let ok = match state
        .hasher
        .verify_blocking(account.encrypted_password.clone(), req.password)
        .await
    {
        Ok(ok) => ok,
        Err(e) => {
            warn!(number = req.number, error = %e, "login password check failed");
            return Err(AppError::Forbidden);
        }
    };
    if !ok {
        warn!(number = req.number, "login invalid password");
        return Err(AppError::Forbidden);
    }

    let token = state.keys.issue(&account)?;
    info!(id = account.id, number = account.number, "account logged in");
    Ok(Json(LoginResponse {
        number: account.number,
        token,
    }))
}
