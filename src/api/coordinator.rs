use crate::{
    auth::auth::AuthUser,
    error::{ApiError, ApiResult, ErrorBody, FieldErrors},
    model::{
        profile::{Profile, ProfileFields, descricao_cargo},
        role::Role,
    },
    services::user_service::{self, NewUser, PersonPatch},
    utils::cpf_registry::CpfRegistry,
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::error;
use utoipa::ToSchema;

const COORDINATOR_ROLES: &[Role] = &[Role::ProgramCoordinator, Role::GeneralCoordinator];

/// Onboarding for both coordinator kinds; `role` picks which profile
/// (program link or title) gets stored.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CoordinatorPayload {
    #[serde(flatten)]
    pub user: NewUser,
    pub role: Role,
    /// Program coordinators only
    #[schema(nullable = true)]
    pub programa: Option<i64>,
    /// General coordinators only, required for them
    #[schema(example = "Diretora de Ensino", nullable = true)]
    pub titulo: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CoordinatorPatch {
    #[serde(flatten)]
    pub person: PersonPatch,
    /// Must match the stored role when sent
    pub role: Option<Role>,
}

#[derive(Debug, sqlx::FromRow)]
struct CoordinatorRow {
    id: i64,
    username: String,
    nome_completo: String,
    email: String,
    cpf: String,
    telefone: Option<String>,
    role: String,
    programa: Option<i64>,
    programa_nome: Option<String>,
    titulo: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CoordinatorResponse {
    #[schema(example = 5)]
    pub id: i64,
    pub username: String,
    pub nome_completo: String,
    pub email: String,
    pub cpf: String,
    #[schema(nullable = true)]
    pub telefone: Option<String>,
    pub role: Role,
    #[schema(nullable = true)]
    pub programa: Option<i64>,
    #[schema(nullable = true)]
    pub programa_nome: Option<String>,
    #[schema(nullable = true)]
    pub titulo: Option<String>,
    #[schema(example = "Coord. Programa: Clínica Médica")]
    pub descricao_cargo: String,
}

impl TryFrom<CoordinatorRow> for CoordinatorResponse {
    type Error = ApiError;

    fn try_from(row: CoordinatorRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<Role>().map_err(|_| {
            error!(user_id = row.id, role = %row.role, "Stored role is not a known tag");
            ApiError::Internal
        })?;
        let descricao_cargo = descricao_cargo(role, row.programa_nome.as_deref(), row.titulo.as_deref());

        Ok(Self {
            id: row.id,
            username: row.username,
            nome_completo: row.nome_completo,
            email: row.email,
            cpf: row.cpf,
            telefone: row.telefone,
            role,
            programa: row.programa,
            programa_nome: row.programa_nome,
            titulo: row.titulo,
            descricao_cargo,
        })
    }
}

const COORDINATOR_SELECT: &str = r#"
    SELECT
        u.id,
        u.username,
        TRIM(u.first_name || ' ' || u.last_name) AS nome_completo,
        u.email,
        u.cpf,
        u.telefone,
        u.role,
        cp.programa_id AS programa,
        p.nome AS programa_nome,
        cg.titulo
    FROM usuarios u
    LEFT JOIN perfil_coordenador_programa cp ON cp.usuario_id = u.id
    LEFT JOIN programas p ON p.id = cp.programa_id
    LEFT JOIN perfil_coordenador_geral cg ON cg.usuario_id = u.id
    WHERE u.role IN ('coordenador_programa', 'coordenador_geral')
"#;

async fn fetch(pool: &SqlitePool, id: i64) -> ApiResult<CoordinatorResponse> {
    let sql = format!("{COORDINATOR_SELECT} AND u.id = ?");
    sqlx::query_as::<_, CoordinatorRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Coordinator"))?
        .try_into()
}

/// List program and general coordinators
#[utoipa::path(
    get,
    path = "/api/coordenadores",
    responses(
        (status = 200, description = "All coordinators", body = [CoordinatorResponse]),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "People"
)]
pub async fn list_coordinators(_auth: AuthUser, pool: web::Data<SqlitePool>) -> ApiResult<impl Responder> {
    let sql = format!("{COORDINATOR_SELECT} ORDER BY u.first_name, u.last_name, u.id");
    let coordinators = sqlx::query_as::<_, CoordinatorRow>(&sql)
        .fetch_all(pool.get_ref())
        .await?
        .into_iter()
        .map(CoordinatorResponse::try_from)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(HttpResponse::Ok().json(coordinators))
}

/// Onboard a coordinator of either kind
#[utoipa::path(
    post,
    path = "/api/coordenadores",
    request_body = CoordinatorPayload,
    responses(
        (status = 201, description = "Coordinator created", body = CoordinatorResponse),
        (status = 400, description = "Invalid fields, role or program", body = ErrorBody),
        (status = 409, description = "CPF in use or program already coordinated", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "People"
)]
pub async fn create_coordinator(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    registry: web::Data<CpfRegistry>,
    payload: web::Json<CoordinatorPayload>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let payload = payload.into_inner();

    let mut errors = FieldErrors::new();
    payload.user.validate(&mut errors);
    if !payload.role.is_coordinator() {
        errors.add(
            "role",
            "Role must be coordenador_programa or coordenador_geral.",
        );
        return Err(ApiError::Validation(errors));
    }

    let fields = match payload.role {
        Role::ProgramCoordinator => ProfileFields {
            programa: payload.programa,
            ..Default::default()
        },
        _ => ProfileFields {
            titulo: payload.titulo,
            ..Default::default()
        },
    };
    let profile = Profile::from_fields(payload.role, fields, &mut errors);
    errors.into_result()?;

    let id = user_service::onboard(
        pool.get_ref(),
        &registry,
        &payload.user,
        payload.role,
        profile.as_ref(),
    )
    .await?;

    Ok(HttpResponse::Created().json(fetch(pool.get_ref(), id).await?))
}

/// Get a coordinator
#[utoipa::path(
    get,
    path = "/api/coordenadores/{id}",
    params(("id" = i64, Path, description = "Coordinator user id")),
    responses(
        (status = 200, description = "Coordinator found", body = CoordinatorResponse),
        (status = 404, description = "Coordinator not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "People"
)]
pub async fn get_coordinator(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<impl Responder> {
    Ok(HttpResponse::Ok().json(fetch(pool.get_ref(), path.into_inner()).await?))
}

/// Update a coordinator (omitted fields are kept; the role cannot change)
#[utoipa::path(
    patch,
    path = "/api/coordenadores/{id}",
    params(("id" = i64, Path, description = "Coordinator user id")),
    request_body = CoordinatorPatch,
    responses(
        (status = 200, description = "Coordinator updated", body = CoordinatorResponse),
        (status = 400, description = "Invalid fields or role change", body = ErrorBody),
        (status = 404, description = "Coordinator not found", body = ErrorBody),
        (status = 409, description = "Program already coordinated", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "People"
)]
pub async fn update_coordinator(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    registry: web::Data<CpfRegistry>,
    path: web::Path<i64>,
    payload: web::Json<CoordinatorPatch>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let id = path.into_inner();
    let current = fetch(pool.get_ref(), id).await?;

    if let Some(role) = payload.role {
        if role != current.role {
            return Err(ApiError::validation("role", "The role of a user cannot change."));
        }
    }

    user_service::update_person(
        pool.get_ref(),
        &registry,
        id,
        COORDINATOR_ROLES,
        "Coordinator",
        &payload.person.user,
        &payload.person.profile,
    )
    .await?;

    Ok(HttpResponse::Ok().json(fetch(pool.get_ref(), id).await?))
}

/// Delete a coordinator together with its user
#[utoipa::path(
    delete,
    path = "/api/coordenadores/{id}",
    params(("id" = i64, Path, description = "Coordinator user id")),
    responses(
        (status = 204, description = "Coordinator deleted"),
        (status = 404, description = "Coordinator not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "People"
)]
pub async fn delete_coordinator(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    registry: web::Data<CpfRegistry>,
    path: web::Path<i64>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    user_service::delete_person(
        pool.get_ref(),
        &registry,
        path.into_inner(),
        COORDINATOR_ROLES,
        "Coordinator",
    )
    .await?;
    Ok(HttpResponse::NoContent().finish())
}
