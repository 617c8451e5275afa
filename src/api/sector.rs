use crate::{
    auth::auth::AuthUser,
    error::{ApiError, ApiResult, ErrorBody, FieldErrors},
    model::sector::Sector,
    utils::{db_utils::SqlUpdate, validation::check_text},
};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info};
use utoipa::ToSchema;

const NOME_MAX: usize = 200;
const ENDERECO_MAX: usize = 255;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SectorPayload {
    #[schema(example = "Hospital A")]
    pub nome: String,
    #[schema(example = "Av. Agamenon Magalhães, s/n")]
    pub endereco: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SectorPatch {
    pub nome: Option<String>,
    pub endereco: Option<String>,
}

impl From<SectorPayload> for SectorPatch {
    fn from(p: SectorPayload) -> Self {
        Self {
            nome: Some(p.nome),
            endereco: Some(p.endereco),
        }
    }
}

fn validate(nome: Option<&str>, endereco: Option<&str>) -> ApiResult<()> {
    let mut errors = FieldErrors::new();
    if let Some(nome) = nome {
        check_text(&mut errors, "nome", nome, NOME_MAX);
    }
    if let Some(endereco) = endereco {
        check_text(&mut errors, "endereco", endereco, ENDERECO_MAX);
    }
    errors.into_result()
}

async fn fetch(pool: &SqlitePool, id: i64) -> ApiResult<Sector> {
    sqlx::query_as::<_, Sector>("SELECT id, nome, endereco FROM setores WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Sector"))
}

/// List sectors
#[utoipa::path(
    get,
    path = "/api/setores",
    responses(
        (status = 200, description = "All sectors", body = [Sector]),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Organisation"
)]
pub async fn list_sectors(_auth: AuthUser, pool: web::Data<SqlitePool>) -> ApiResult<impl Responder> {
    let sectors = sqlx::query_as::<_, Sector>("SELECT id, nome, endereco FROM setores ORDER BY nome, id")
        .fetch_all(pool.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(sectors))
}

/// Create a sector
#[utoipa::path(
    post,
    path = "/api/setores",
    request_body = SectorPayload,
    responses(
        (status = 201, description = "Sector created", body = Sector),
        (status = 400, description = "Invalid fields", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Organisation"
)]
pub async fn create_sector(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<SectorPayload>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    validate(Some(&payload.nome), Some(&payload.endereco))?;

    let sector = sqlx::query_as::<_, Sector>(
        "INSERT INTO setores (nome, endereco) VALUES (?, ?) RETURNING id, nome, endereco",
    )
    .bind(payload.nome.trim())
    .bind(payload.endereco.trim())
    .fetch_one(pool.get_ref())
    .await?;

    info!(setor_id = sector.id, "Sector created");
    Ok(HttpResponse::Created().json(sector))
}

/// Get a sector
#[utoipa::path(
    get,
    path = "/api/setores/{id}",
    params(("id" = i64, Path, description = "Sector id")),
    responses(
        (status = 200, description = "Sector found", body = Sector),
        (status = 404, description = "Sector not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Organisation"
)]
pub async fn get_sector(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<impl Responder> {
    Ok(HttpResponse::Ok().json(fetch(pool.get_ref(), path.into_inner()).await?))
}

async fn apply_patch(pool: &SqlitePool, id: i64, patch: SectorPatch) -> ApiResult<Sector> {
    validate(patch.nome.as_deref(), patch.endereco.as_deref())?;
    fetch(pool, id).await?;

    let mut update = SqlUpdate::new("setores");
    update
        .set_some("nome", patch.nome.as_deref().map(str::trim))
        .set_some("endereco", patch.endereco.as_deref().map(str::trim));
    update.execute(pool, "id", id).await?;

    debug!(setor_id = id, "Sector updated");
    fetch(pool, id).await
}

/// Replace a sector
#[utoipa::path(
    put,
    path = "/api/setores/{id}",
    params(("id" = i64, Path, description = "Sector id")),
    request_body = SectorPayload,
    responses(
        (status = 200, description = "Sector updated", body = Sector),
        (status = 400, description = "Invalid fields", body = ErrorBody),
        (status = 404, description = "Sector not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Organisation"
)]
pub async fn update_sector(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<SectorPayload>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let sector = apply_patch(pool.get_ref(), path.into_inner(), payload.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(sector))
}

/// Partially update a sector
#[utoipa::path(
    patch,
    path = "/api/setores/{id}",
    params(("id" = i64, Path, description = "Sector id")),
    request_body = SectorPatch,
    responses(
        (status = 200, description = "Sector updated", body = Sector),
        (status = 404, description = "Sector not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Organisation"
)]
pub async fn patch_sector(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<SectorPatch>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let sector = apply_patch(pool.get_ref(), path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(sector))
}

/// Delete a sector without programs
#[utoipa::path(
    delete,
    path = "/api/setores/{id}",
    params(("id" = i64, Path, description = "Sector id")),
    responses(
        (status = 204, description = "Sector deleted"),
        (status = 404, description = "Sector not found", body = ErrorBody),
        (status = 409, description = "Sector still has programs", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Organisation"
)]
pub async fn delete_sector(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let id = path.into_inner();

    let mut tx = pool.begin().await?;

    let programs = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM programas WHERE setor_id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    if programs > 0 {
        info!(setor_id = id, programs, "Sector delete blocked by programs");
        return Err(ApiError::ProtectedDelete {
            dependents: "programas",
            count: programs,
        });
    }

    let result = sqlx::query("DELETE FROM setores WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Sector"));
    }

    tx.commit().await?;

    info!(setor_id = id, "Sector deleted");
    Ok(HttpResponse::NoContent().finish())
}
