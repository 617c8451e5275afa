use crate::{
    auth::auth::AuthUser,
    error::{ApiError, ApiResult, ErrorBody, FieldErrors},
    model::turma::{TURMA_SELECT, TurmaResponse},
    services::user_service::program_exists,
    utils::{db_utils::SqlUpdate, validation::check_text},
};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use utoipa::ToSchema;

const CODIGO_MAX: usize = 50;

#[derive(Debug, Deserialize, ToSchema)]
pub struct TurmaPayload {
    #[schema(example = "T1")]
    pub codigo: String,
    #[schema(example = 1)]
    pub programa: i64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TurmaPatch {
    pub codigo: Option<String>,
    pub programa: Option<i64>,
}

impl From<TurmaPayload> for TurmaPatch {
    fn from(p: TurmaPayload) -> Self {
        Self {
            codigo: Some(p.codigo),
            programa: Some(p.programa),
        }
    }
}

impl TurmaPatch {
    async fn validate(&self, pool: &SqlitePool) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(codigo) = &self.codigo {
            check_text(&mut errors, "codigo", codigo, CODIGO_MAX);
        }
        if let Some(programa) = self.programa {
            let mut conn = pool.acquire().await?;
            if !program_exists(&mut conn, programa).await? {
                errors.add("programa", format!("Invalid pk \"{programa}\" - object does not exist."));
            }
        }
        errors.into_result()
    }
}

async fn fetch(pool: &SqlitePool, id: i64) -> ApiResult<TurmaResponse> {
    let sql = format!("{TURMA_SELECT} WHERE t.id = ?");
    sqlx::query_as::<_, TurmaResponse>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Class"))
}

/// List classes with their program name and resident count
#[utoipa::path(
    get,
    path = "/api/turmas",
    responses(
        (status = 200, description = "All classes", body = [TurmaResponse]),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Organisation"
)]
pub async fn list_turmas(_auth: AuthUser, pool: web::Data<SqlitePool>) -> ApiResult<impl Responder> {
    let sql = format!("{TURMA_SELECT} ORDER BY t.codigo");
    let turmas = sqlx::query_as::<_, TurmaResponse>(&sql)
        .fetch_all(pool.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(turmas))
}

/// Create a class
#[utoipa::path(
    post,
    path = "/api/turmas",
    request_body = TurmaPayload,
    responses(
        (status = 201, description = "Class created", body = TurmaResponse),
        (status = 400, description = "Invalid fields or program", body = ErrorBody),
        (status = 409, description = "Class code already in use", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Organisation"
)]
pub async fn create_turma(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<TurmaPayload>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let payload = payload.into_inner();
    let codigo = payload.codigo.trim().to_string();
    let programa = payload.programa;
    TurmaPatch::from(payload).validate(pool.get_ref()).await?;

    let id = sqlx::query_scalar::<_, i64>("INSERT INTO turmas (codigo, programa_id) VALUES (?, ?) RETURNING id")
        .bind(&codigo)
        .bind(programa)
        .fetch_one(pool.get_ref())
        .await?;

    info!(turma_id = id, programa, "Class created");
    Ok(HttpResponse::Created().json(fetch(pool.get_ref(), id).await?))
}

/// Get a class
#[utoipa::path(
    get,
    path = "/api/turmas/{id}",
    params(("id" = i64, Path, description = "Class id")),
    responses(
        (status = 200, description = "Class found", body = TurmaResponse),
        (status = 404, description = "Class not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Organisation"
)]
pub async fn get_turma(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<impl Responder> {
    Ok(HttpResponse::Ok().json(fetch(pool.get_ref(), path.into_inner()).await?))
}

async fn apply_patch(pool: &SqlitePool, id: i64, patch: TurmaPatch) -> ApiResult<TurmaResponse> {
    fetch(pool, id).await?;
    patch.validate(pool).await?;

    let mut update = SqlUpdate::new("turmas");
    update
        .set_some("codigo", patch.codigo.as_deref().map(str::trim))
        .set_some("programa_id", patch.programa);
    update.execute(pool, "id", id).await?;

    fetch(pool, id).await
}

/// Replace a class
#[utoipa::path(
    put,
    path = "/api/turmas/{id}",
    params(("id" = i64, Path, description = "Class id")),
    request_body = TurmaPayload,
    responses(
        (status = 200, description = "Class updated", body = TurmaResponse),
        (status = 404, description = "Class not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Organisation"
)]
pub async fn update_turma(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<TurmaPayload>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let turma = apply_patch(pool.get_ref(), path.into_inner(), payload.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(turma))
}

/// Partially update a class
#[utoipa::path(
    patch,
    path = "/api/turmas/{id}",
    params(("id" = i64, Path, description = "Class id")),
    request_body = TurmaPatch,
    responses(
        (status = 200, description = "Class updated", body = TurmaResponse),
        (status = 404, description = "Class not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Organisation"
)]
pub async fn patch_turma(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<TurmaPatch>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let turma = apply_patch(pool.get_ref(), path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(turma))
}

/// Delete a class; its residents stay, without a class
#[utoipa::path(
    delete,
    path = "/api/turmas/{id}",
    params(("id" = i64, Path, description = "Class id")),
    responses(
        (status = 204, description = "Class deleted"),
        (status = 404, description = "Class not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Organisation"
)]
pub async fn delete_turma(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let id = path.into_inner();

    let result = sqlx::query("DELETE FROM turmas WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Class"));
    }

    info!(turma_id = id, "Class deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use crate::model::role::Role;
    use crate::test_support::{
        TestContext, call, delete, get, init_app, post_json, put_json, seed_program, seed_resident, seed_sector,
        seed_turma, seed_user,
    };
    use actix_web::http::StatusCode;
    use serde_json::json;

    #[actix_web::test]
    async fn counts_residents_per_class() {
        let ctx = TestContext::new().await;
        let staff = seed_user(&ctx, Role::Secretary, "700").await;
        let token = ctx.token(staff, Role::Secretary);
        let setor = seed_sector(&ctx, "Hospital A").await;
        let programa = seed_program(&ctx, setor, "P001").await;
        let turma = seed_turma(&ctx, programa, "T1").await;
        seed_turma(&ctx, programa, "T2").await;
        seed_resident(&ctx, "701", "R001", Some(turma)).await;
        seed_resident(&ctx, "702", "R002", Some(turma)).await;
        let app = init_app(&ctx).await;

        let (status, list) = call(&app, get("/api/turmas", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list[0]["codigo"], "T1");
        assert_eq!(list[0]["programa_nome"], "Clínica Médica");
        assert_eq!(list[0]["residentes_count"], 2);
        assert_eq!(list[1]["residentes_count"], 0);
    }

    #[actix_web::test]
    async fn deleting_class_keeps_residents() {
        let ctx = TestContext::new().await;
        let staff = seed_user(&ctx, Role::Secretary, "710").await;
        let token = ctx.token(staff, Role::Secretary);
        let setor = seed_sector(&ctx, "Hospital A").await;
        let programa = seed_program(&ctx, setor, "P001").await;
        let turma = seed_turma(&ctx, programa, "T1").await;
        let residente = seed_resident(&ctx, "711", "R001", Some(turma)).await;
        let app = init_app(&ctx).await;

        let (status, _) = call(&app, delete(&format!("/api/turmas/{turma}"), Some(&token))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = call(&app, get(&format!("/api/residentes/{residente}"), Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["matricula"], "R001");
        assert!(body["turma"].is_null());
    }

    #[actix_web::test]
    async fn create_and_replace() {
        let ctx = TestContext::new().await;
        let staff = seed_user(&ctx, Role::ProgramCoordinator, "720").await;
        let token = ctx.token(staff, Role::ProgramCoordinator);
        let setor = seed_sector(&ctx, "Hospital A").await;
        let programa = seed_program(&ctx, setor, "P001").await;
        let other = seed_program(&ctx, setor, "P002").await;
        let app = init_app(&ctx).await;

        let (status, created) = call(
            &app,
            post_json("/api/turmas", Some(&token), json!({"codigo": "T1", "programa": programa})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_i64().unwrap();

        let (status, replaced) = call(
            &app,
            put_json(&format!("/api/turmas/{id}"), Some(&token), json!({"codigo": "T1-B", "programa": other})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(replaced["codigo"], "T1-B");
        assert_eq!(replaced["programa"], other);

        let (status, _) = call(
            &app,
            put_json(&format!("/api/turmas/{id}"), Some(&token), json!({"codigo": "T1-C"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &app,
            post_json("/api/turmas", Some(&token), json!({"codigo": "T9", "programa": 999})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"]["programa"].is_array());
    }
}
