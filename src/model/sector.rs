use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Sector {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Hospital A")]
    pub nome: String,
    #[schema(example = "Av. Agamenon Magalhães, s/n")]
    pub endereco: String,
}
