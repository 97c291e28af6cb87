use serde::{Deserialize, Serialize};

/// JWT payload binding a bearer to one account number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(rename = "accountNumber")]
    pub account_number: i64,
    #[serde(rename = "expiresAt")]
    pub expires_at: i64, // unix seconds
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}
