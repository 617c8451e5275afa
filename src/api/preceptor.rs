use crate::{
    auth::auth::AuthUser,
    error::{ApiError, ApiResult, ErrorBody, FieldErrors},
    model::{
        profile::{Profile, ProfileFields},
        role::Role,
    },
    services::user_service::{self, NewUser, PersonPatch},
    utils::cpf_registry::CpfRegistry,
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PreceptorPayload {
    #[serde(flatten)]
    pub user: NewUser,
    #[schema(example = "Cardiologia")]
    pub especialidade: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct PreceptorResponse {
    #[schema(example = 3)]
    pub usuario: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[schema(example = "Carla Mendes")]
    pub nome_completo: String,
    pub email: String,
    pub cpf: String,
    #[schema(nullable = true)]
    pub telefone: Option<String>,
    #[schema(example = "Cardiologia")]
    pub especialidade: String,
}

const PRECEPTOR_SELECT: &str = r#"
    SELECT
        p.usuario_id AS usuario,
        u.username,
        u.first_name,
        u.last_name,
        TRIM(u.first_name || ' ' || u.last_name) AS nome_completo,
        u.email,
        u.cpf,
        u.telefone,
        p.especialidade
    FROM perfil_preceptor p
    JOIN usuarios u ON u.id = p.usuario_id
"#;

async fn fetch(pool: &SqlitePool, usuario: i64) -> ApiResult<PreceptorResponse> {
    let sql = format!("{PRECEPTOR_SELECT} WHERE p.usuario_id = ?");
    sqlx::query_as::<_, PreceptorResponse>(&sql)
        .bind(usuario)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Preceptor"))
}

/// List preceptors
#[utoipa::path(
    get,
    path = "/api/preceptores",
    responses(
        (status = 200, description = "All preceptors", body = [PreceptorResponse]),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "People"
)]
pub async fn list_preceptors(_auth: AuthUser, pool: web::Data<SqlitePool>) -> ApiResult<impl Responder> {
    let sql = format!("{PRECEPTOR_SELECT} ORDER BY u.first_name, u.last_name, p.usuario_id");
    let preceptors = sqlx::query_as::<_, PreceptorResponse>(&sql)
        .fetch_all(pool.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(preceptors))
}

/// Onboard a preceptor: user and profile are stored together or not at all
#[utoipa::path(
    post,
    path = "/api/preceptores",
    request_body = PreceptorPayload,
    responses(
        (status = 201, description = "Preceptor created", body = PreceptorResponse),
        (status = 400, description = "Invalid user or profile fields", body = ErrorBody),
        (status = 409, description = "CPF or username already registered", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "People"
)]
pub async fn create_preceptor(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    registry: web::Data<CpfRegistry>,
    payload: web::Json<PreceptorPayload>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let payload = payload.into_inner();

    let mut errors = FieldErrors::new();
    payload.user.validate(&mut errors);
    let fields = ProfileFields {
        especialidade: payload.especialidade,
        ..Default::default()
    };
    let profile = Profile::from_fields(Role::Preceptor, fields, &mut errors);
    errors.into_result()?;

    let usuario = user_service::onboard(
        pool.get_ref(),
        &registry,
        &payload.user,
        Role::Preceptor,
        profile.as_ref(),
    )
    .await?;

    Ok(HttpResponse::Created().json(fetch(pool.get_ref(), usuario).await?))
}

/// Get a preceptor
#[utoipa::path(
    get,
    path = "/api/preceptores/{usuario}",
    params(("usuario" = i64, Path, description = "Preceptor user id")),
    responses(
        (status = 200, description = "Preceptor found", body = PreceptorResponse),
        (status = 404, description = "Preceptor not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "People"
)]
pub async fn get_preceptor(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<impl Responder> {
    Ok(HttpResponse::Ok().json(fetch(pool.get_ref(), path.into_inner()).await?))
}

/// Update a preceptor's user fields and specialty (omitted fields are kept)
#[utoipa::path(
    patch,
    path = "/api/preceptores/{usuario}",
    params(("usuario" = i64, Path, description = "Preceptor user id")),
    request_body = PersonPatch,
    responses(
        (status = 200, description = "Preceptor updated", body = PreceptorResponse),
        (status = 400, description = "Invalid fields", body = ErrorBody),
        (status = 404, description = "Preceptor not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "People"
)]
pub async fn update_preceptor(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    registry: web::Data<CpfRegistry>,
    path: web::Path<i64>,
    payload: web::Json<PersonPatch>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let usuario = path.into_inner();

    user_service::update_person(
        pool.get_ref(),
        &registry,
        usuario,
        &[Role::Preceptor],
        "Preceptor",
        &payload.user,
        &payload.profile,
    )
    .await?;

    Ok(HttpResponse::Ok().json(fetch(pool.get_ref(), usuario).await?))
}

/// Delete a preceptor together with its user
#[utoipa::path(
    delete,
    path = "/api/preceptores/{usuario}",
    params(("usuario" = i64, Path, description = "Preceptor user id")),
    responses(
        (status = 204, description = "Preceptor deleted"),
        (status = 404, description = "Preceptor not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "People"
)]
pub async fn delete_preceptor(
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
        &[Role::Preceptor],
        "Preceptor",
    )
    .await?;
    Ok(HttpResponse::NoContent().finish())
}
