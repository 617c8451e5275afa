use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identity projection, also what `/usuarios/me` returns.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct UserResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "maria.souza")]
    pub username: String,
    #[schema(example = "Maria")]
    pub first_name: String,
    #[schema(example = "Souza")]
    pub last_name: String,
    #[schema(example = "maria@hospital.org")]
    pub email: String,
    #[schema(example = "123.456.789-00")]
    pub cpf: String,
    #[schema(example = "residente", value_type = String)]
    pub role: String,
    #[schema(example = "+55 81 99999-0000", nullable = true)]
    pub telefone: Option<String>,
}

pub const USER_COLUMNS: &str = "id, username, first_name, last_name, email, cpf, role, telefone";

/// `first last`, trimmed; empty when both parts are.
pub fn full_name(first_name: &str, last_name: &str) -> String {
    format!("{first_name} {last_name}").trim().to_string()
}
