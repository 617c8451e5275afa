use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Program with its sector and coordinator resolved to display names.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "codigo": "P001",
        "nome": "Clínica Médica",
        "duracao": "2 anos",
        "setor": 1,
        "setor_nome": "Hospital A",
        "coordenador": null,
        "coordenador_nome": null
    })
)]
pub struct ProgramResponse {
    pub id: i64,
    pub codigo: String,
    pub nome: String,
    pub duracao: String,
    pub setor: i64,
    pub setor_nome: String,
    #[schema(nullable = true)]
    pub coordenador: Option<i64>,
    #[schema(nullable = true)]
    pub coordenador_nome: Option<String>,
}

pub const PROGRAM_SELECT: &str = r#"
    SELECT
        p.id,
        p.codigo,
        p.nome,
        p.duracao,
        p.setor_id AS setor,
        s.nome AS setor_nome,
        p.coordenador_id AS coordenador,
        TRIM(u.first_name || ' ' || u.last_name) AS coordenador_nome
    FROM programas p
    JOIN setores s ON s.id = p.setor_id
    LEFT JOIN usuarios u ON u.id = p.coordenador_id
"#;
