use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::{
    gate::{authorize, Admission, Target},
    TOKEN_HEADER,
};
use crate::{accounts::Account, error::AppError, state::AppState};

/// The account bound to the presented `x-jwt-token`.
pub struct AuthAccount(pub Account);

#[async_trait]
impl FromRequestParts<AppState> for AuthAccount {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(TOKEN_HEADER)
            .and_then(|h| h.to_str().ok());

        match authorize(&state.keys, state.store.as_ref(), token, Target::TokenHolder).await {
            Admission::Admit(account) => Ok(AuthAccount(account)),
            Admission::Deny => Err(AppError::Forbidden),
        }
    }
}
