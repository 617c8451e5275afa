use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Token request. The identifier is a CPF even though the field keeps the
/// conventional `username` name; `cpf` is accepted as an alias.
#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[serde(alias = "cpf")]
    #[schema(example = "123.456.789-00")]
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RefreshReqDto {
    pub refresh: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(sqlx::FromRow)]
pub struct UserSql {
    pub id: i64,
    pub cpf: String,
    pub password: String,
    pub role: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    /// CPF of the user
    pub sub: String,
    pub role: String,
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
