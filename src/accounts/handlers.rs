use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{HeaderMap, HeaderValue},
    middleware,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{CreateAccountRequest, DeletedResponse},
    repo_types::Account,
    services::open_account,
};
use crate::{
    auth::{gate::require_account_token, jwt::TokenError, TOKEN_HEADER},
    error::AppError,
    state::AppState,
};

pub fn account_routes(state: AppState) -> Router<AppState> {
    let by_id = Router::new()
        .route("/account/:id", get(get_account).delete(delete_account))
        .route_layer(middleware::from_fn_with_state(state, require_account_token));

    Router::new()
        .route("/account", get(list_accounts).post(create_account))
        .merge(by_id)
}

#[instrument(skip(state))]
pub async fn list_accounts(State(state): State<AppState>) -> Result<Json<Vec<Account>>, AppError> {
    let accounts = state.store.get_accounts().await?;
    Ok(Json(accounts))
}

/// The signed token travels back in the `x-jwt-token` response header.
#[instrument(skip(state, payload))]
pub async fn create_account(
    State(state): State<AppState>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<Account>), AppError> {
    let Json(req) = payload?;
    let account = open_account(state.store.as_ref(), &state.hasher, req).await?;

    let token = state.keys.issue(&account)?;
    let mut headers = HeaderMap::new();
    headers.insert(
        TOKEN_HEADER,
        HeaderValue::from_str(&token).map_err(|e| TokenError::Signing(e.to_string()))?,
    );
    info!(id = account.id, number = account.number, "token issued");

    Ok((headers, Json(account)))
}

#[instrument(skip(state))]
pub async fn get_account(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Account>, AppError> {
    let Path(id) = id?;
    let account = state.store.get_account_by_id(id).await?;
    Ok(Json(account))
}

#[instrument(skip(state))]
pub async fn delete_account(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<DeletedResponse>, AppError> {
    let Path(id) = id?;
    state.store.delete_account(id).await?;
    info!(id, "account deleted");
    Ok(Json(DeletedResponse { deleted: id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::StoreError;

    #[tokio::test]
    async fn get_account_for_missing_id_is_not_found() {
        let state = AppState::in_memory("secret");
        let err = get_account(State(state), Ok(Path(404))).await.unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_reports_deleted_id() {
        let state = AppState::in_memory("secret");
        let req = CreateAccountRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            password: "pw".into(),
        };
        let (headers, Json(account)) = create_account(State(state.clone()), Ok(Json(req)))
            .await
            .unwrap();
        assert!(headers.contains_key(TOKEN_HEADER));

        let Json(resp) = delete_account(State(state.clone()), Ok(Path(account.id)))
            .await
            .unwrap();
        assert_eq!(resp.deleted, account.id);
        assert!(state.store.get_accounts().await.unwrap().is_empty());
    }
}
