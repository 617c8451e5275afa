use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A cohort (turma) inside a program.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct TurmaResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "T1")]
    pub codigo: String,
    #[schema(example = 1)]
    pub programa: i64,
    #[schema(example = "Clínica Médica")]
    pub programa_nome: String,
    #[schema(example = 12)]
    pub residentes_count: i64,
}

pub const TURMA_SELECT: &str = r#"
    SELECT
        t.id,
        t.codigo,
        t.programa_id AS programa,
        p.nome AS programa_nome,
        (SELECT COUNT(*) FROM perfil_residente r WHERE r.turma_id = t.id) AS residentes_count
    FROM turmas t
    JOIN programas p ON p.id = t.programa_id
"#;
