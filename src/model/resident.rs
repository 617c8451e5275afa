use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Resident profile flattened with its user, class and preceptor.
/// Raw ids (`usuario`, `turma`, `preceptor`) sit next to the derived
/// display fields.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ResidentResponse {
    #[schema(example = 7)]
    pub usuario: i64,
    #[schema(example = "João Pereira")]
    pub nome_completo: String,
    #[schema(example = "joao@hospital.org")]
    pub email: String,
    #[schema(example = "987.654.321-00")]
    pub cpf: String,
    #[schema(nullable = true)]
    pub telefone: Option<String>,
    #[schema(example = "R001")]
    pub matricula: String,
    #[schema(nullable = true)]
    pub turma: Option<i64>,
    #[schema(nullable = true)]
    pub turma_codigo: Option<String>,
    #[schema(nullable = true)]
    pub preceptor: Option<i64>,
    #[schema(nullable = true)]
    pub preceptor_nome: Option<String>,
}

pub const RESIDENT_SELECT: &str = r#"
    SELECT
        r.usuario_id AS usuario,
        TRIM(u.first_name || ' ' || u.last_name) AS nome_completo,
        u.email,
        u.cpf,
        u.telefone,
        r.matricula,
        r.turma_id AS turma,
        t.codigo AS turma_codigo,
        r.preceptor_id AS preceptor,
        TRIM(pu.first_name || ' ' || pu.last_name) AS preceptor_nome
    FROM perfil_residente r
    JOIN usuarios u ON u.id = r.usuario_id
    LEFT JOIN turmas t ON t.id = r.turma_id
    LEFT JOIN usuarios pu ON pu.id = r.preceptor_id
"#;
