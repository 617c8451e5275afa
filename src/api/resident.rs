use crate::{
    auth::auth::AuthUser,
    error::{ApiError, ApiResult, ErrorBody, FieldErrors},
    model::{
        profile::{Profile, ResidentFields},
        resident::{RESIDENT_SELECT, ResidentResponse},
        role::Role,
    },
    services::user_service::{self, PersonPatch},
    utils::{cpf_registry::CpfRegistry, validation::check_text},
};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

/// Attaches a resident profile to a user created with the `residente` role.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResidentPayload {
    #[schema(example = 7)]
    pub usuario: i64,
    #[schema(example = "R001")]
    pub matricula: String,
    #[schema(nullable = true)]
    pub turma: Option<i64>,
    #[schema(nullable = true)]
    pub preceptor: Option<i64>,
}

pub async fn fetch(pool: &SqlitePool, usuario: i64) -> ApiResult<ResidentResponse> {
    let sql = format!("{RESIDENT_SELECT} WHERE r.usuario_id = ?");
    sqlx::query_as::<_, ResidentResponse>(&sql)
        .bind(usuario)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Resident"))
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ResidentFilter {
    /// Filter by class id
    #[schema(example = 2)]
    pub turma: Option<i64>,
    /// Filter by supervising preceptor user id
    #[schema(example = 3)]
    pub preceptor: Option<i64>,
}

/// List residents with user, class and preceptor resolved
#[utoipa::path(
    get,
    path = "/api/residentes",
    params(ResidentFilter),
    responses(
        (status = 200, description = "Residents matching the filter", body = [ResidentResponse]),
        (status = 400, description = "Invalid filter", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "People"
)]
pub async fn list_residents(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<ResidentFilter>,
) -> ApiResult<impl Responder> {
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<i64> = Vec::new();

    if let Some(turma) = query.turma {
        where_sql.push_str(" AND r.turma_id = ?");
        args.push(turma);
    }
    if let Some(preceptor) = query.preceptor {
        where_sql.push_str(" AND r.preceptor_id = ?");
        args.push(preceptor);
    }

    let sql = format!("{RESIDENT_SELECT}{where_sql} ORDER BY r.matricula");
    let mut q = sqlx::query_as::<_, ResidentResponse>(&sql);
    for arg in args {
        q = q.bind(arg);
    }
    let residents = q.fetch_all(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(residents))
}

/// Create a resident profile
#[utoipa::path(
    post,
    path = "/api/residentes",
    request_body = ResidentPayload,
    responses(
        (status = 201, description = "Resident profile created", body = ResidentResponse),
        (status = 400, description = "Invalid fields, user or references", body = ErrorBody),
        (status = 409, description = "Enrollment number in use or profile exists", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "People"
)]
pub async fn create_resident(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<ResidentPayload>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let payload = payload.into_inner();

    let mut errors = FieldErrors::new();
    check_text(
        &mut errors,
        "matricula",
        &payload.matricula,
        crate::model::profile::MATRICULA_MAX,
    );
    errors.into_result()?;

    let profile = Profile::Resident(ResidentFields {
        matricula: payload.matricula,
        turma: payload.turma,
        preceptor: payload.preceptor,
    });
    user_service::attach_resident_profile(pool.get_ref(), payload.usuario, &profile).await?;

    info!(usuario = payload.usuario, "Resident profile created");
    Ok(HttpResponse::Created().json(fetch(pool.get_ref(), payload.usuario).await?))
}

/// Get a resident
#[utoipa::path(
    get,
    path = "/api/residentes/{usuario}",
    params(("usuario" = i64, Path, description = "Resident user id")),
    responses(
        (status = 200, description = "Resident found", body = ResidentResponse),
        (status = 404, description = "Resident not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "People"
)]
pub async fn get_resident(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<impl Responder> {
    Ok(HttpResponse::Ok().json(fetch(pool.get_ref(), path.into_inner()).await?))
}

/// Update a resident's user and profile fields (omitted fields are kept)
#[utoipa::path(
    patch,
    path = "/api/residentes/{usuario}",
    params(("usuario" = i64, Path, description = "Resident user id")),
    request_body = PersonPatch,
    responses(
        (status = 200, description = "Resident updated", body = ResidentResponse),
        (status = 400, description = "Invalid fields or references", body = ErrorBody),
        (status = 404, description = "Resident not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "People"
)]
pub async fn update_resident(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    registry: web::Data<CpfRegistry>,
    path: web::Path<i64>,
    payload: web::Json<PersonPatch>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let usuario = path.into_inner();
    // a resident user without a profile is not part of this collection
    fetch(pool.get_ref(), usuario).await?;

    user_service::update_person(
        pool.get_ref(),
        &registry,
        usuario,
        &[Role::Resident],
        "Resident",
        &payload.user,
        &payload.profile,
    )
    .await?;

    Ok(HttpResponse::Ok().json(fetch(pool.get_ref(), usuario).await?))
}

/// Delete a resident together with its user
#[utoipa::path(
    delete,
    path = "/api/residentes/{usuario}",
    params(("usuario" = i64, Path, description = "Resident user id")),
    responses(
        (status = 204, description = "Resident deleted"),
        (status = 404, description = "Resident not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "People"
)]
pub async fn delete_resident(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    registry: web::Data<CpfRegistry>,
    path: web::Path<i64>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let usuario = path.into_inner();
    fetch(pool.get_ref(), usuario).await?;
    user_service::delete_person(pool.get_ref(), &registry, usuario, &[Role::Resident], "Resident").await?;
    Ok(HttpResponse::NoContent().finish())
}
