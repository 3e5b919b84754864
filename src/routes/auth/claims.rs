use serde::Deserialize;
use uuid::Uuid;

/// Kinds of token the account service issues. Only access tokens open a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

/// What this service reads from a session token. `iss`, `aud` and `exp` are
/// enforced while decoding and not kept.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Claims {
    #[serde(rename = "id")]
    pub user_id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    pub token_use: TokenUse,
}
