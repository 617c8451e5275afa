use crate::error::FieldErrors;
use crate::model::role::Role;
use crate::utils::validation::{check_max_len, check_required};
use serde::Deserialize;
use utoipa::ToSchema;

pub const ESPECIALIDADE_MAX: usize = 100;
pub const TITULO_MAX: usize = 100;
pub const MATRICULA_MAX: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidentFields {
    pub matricula: String,
    pub turma: Option<i64>,
    pub preceptor: Option<i64>,
}

/// Role-specific payload of a user. The variant always agrees with the
/// user's role tag, see [`Profile::role`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Profile {
    Secretary,
    Preceptor { especialidade: String },
    Tutor { especialidade: String },
    GeneralCoordinator { titulo: String },
    ProgramCoordinator { programa: Option<i64> },
    Resident(ResidentFields),
}

/// Loose profile fields as they arrive next to the user fields.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct ProfileFields {
    #[schema(example = "Cardiologia")]
    pub especialidade: Option<String>,
    #[schema(example = "Diretora de Ensino")]
    pub titulo: Option<String>,
    #[schema(example = 1)]
    pub programa: Option<i64>,
    #[schema(example = "R001")]
    pub matricula: Option<String>,
    pub turma: Option<i64>,
    pub preceptor: Option<i64>,
}

impl Profile {
    pub fn role(&self) -> Role {
        match self {
            Profile::Secretary => Role::Secretary,
            Profile::Preceptor { .. } => Role::Preceptor,
            Profile::Tutor { .. } => Role::Tutor,
            Profile::GeneralCoordinator { .. } => Role::GeneralCoordinator,
            Profile::ProgramCoordinator { .. } => Role::ProgramCoordinator,
            Profile::Resident(_) => Role::Resident,
        }
    }

    /// Picks the variant for `role` out of `fields`.
    ///
    /// Residents without a `matricula` get no profile yet; their profile is
    /// attached later through the residents collection.
    pub fn from_fields(role: Role, fields: ProfileFields, errors: &mut FieldErrors) -> Option<Self> {
        match role {
            Role::Secretary => Some(Profile::Secretary),
            Role::Preceptor | Role::Tutor => {
                let especialidade = fields.especialidade.unwrap_or_default();
                check_required(errors, "especialidade", &especialidade);
                check_max_len(errors, "especialidade", &especialidade, ESPECIALIDADE_MAX);
                if role == Role::Preceptor {
                    Some(Profile::Preceptor { especialidade })
                } else {
                    Some(Profile::Tutor { especialidade })
                }
            }
            Role::GeneralCoordinator => {
                let titulo = fields.titulo.unwrap_or_default();
                check_required(errors, "titulo", &titulo);
                check_max_len(errors, "titulo", &titulo, TITULO_MAX);
                Some(Profile::GeneralCoordinator { titulo })
            }
            Role::ProgramCoordinator => Some(Profile::ProgramCoordinator {
                programa: fields.programa,
            }),
            Role::Resident => fields.matricula.map(|matricula| {
                check_required(errors, "matricula", &matricula);
                check_max_len(errors, "matricula", &matricula, MATRICULA_MAX);
                Profile::Resident(ResidentFields {
                    matricula,
                    turma: fields.turma,
                    preceptor: fields.preceptor,
                })
            }),
        }
    }
}

/// Human readable position shown for coordinators.
pub fn descricao_cargo(role: Role, programa_nome: Option<&str>, titulo: Option<&str>) -> String {
    match role {
        Role::ProgramCoordinator => match programa_nome {
            Some(nome) => format!("Coord. Programa: {nome}"),
            None => "Coord. Programa (sem programa vinculado)".to_string(),
        },
        Role::GeneralCoordinator => match titulo {
            Some(titulo) if !titulo.trim().is_empty() => titulo.to_string(),
            _ => "Coordenador(a) Geral".to_string(),
        },
        _ => "N/A".to_string(),
    }
}
