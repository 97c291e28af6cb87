use serde::Deserialize;

/// Request body for `POST /transfer`. The source is the token holder.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub to_account: i32,
    pub amount: i64,
}
