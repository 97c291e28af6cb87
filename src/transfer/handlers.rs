use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use super::{dto::TransferRequest, services::execute_transfer};
use crate::{
    accounts::TransferRecord, auth::extractors::AuthAccount, error::AppError, state::AppState,
};

pub fn transfer_routes() -> Router<AppState> {
    Router::new().route("/transfer", post(transfer))
}

#[instrument(skip(state, source, payload), fields(from = source.0.id))]
pub async fn transfer(
    State(state): State<AppState>,
    source: AuthAccount,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<TransferRecord>, AppError> {
    let Json(req) = payload?;
    let record = execute_transfer(state.store.as_ref(), &source.0, &req).await?;
    Ok(Json(record))
}
