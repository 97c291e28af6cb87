use serde::{Deserialize, Serialize};

/// Request body for opening an account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub first_name: String,
    #[serde(alias = "lastname")]
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: i32,
}
