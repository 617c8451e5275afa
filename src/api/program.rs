use crate::{
    auth::auth::AuthUser,
    error::{ApiError, ApiResult, ErrorBody, FieldErrors},
    model::{
        program::{PROGRAM_SELECT, ProgramResponse},
        role::Role,
    },
    utils::{
        db_utils::SqlUpdate,
        validation::{check_text, nullable},
    },
};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info};
use utoipa::ToSchema;

const CODIGO_MAX: usize = 50;
const NOME_MAX: usize = 200;
const DURACAO_MAX: usize = 50;

/// Write shape: raw ids only. Display fields sent back by clients are ignored.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProgramPayload {
    #[schema(example = "P001")]
    pub codigo: String,
    #[schema(example = "Clínica Médica")]
    pub nome: String,
    #[schema(example = "2 anos")]
    pub duracao: String,
    #[schema(example = 1)]
    pub setor: i64,
    #[schema(nullable = true)]
    pub coordenador: Option<i64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProgramPatch {
    pub codigo: Option<String>,
    pub nome: Option<String>,
    pub duracao: Option<String>,
    pub setor: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i64>, nullable = true)]
    pub coordenador: Option<Option<i64>>,
}

impl From<ProgramPayload> for ProgramPatch {
    fn from(p: ProgramPayload) -> Self {
        Self {
            codigo: Some(p.codigo),
            nome: Some(p.nome),
            duracao: Some(p.duracao),
            setor: Some(p.setor),
            coordenador: Some(p.coordenador),
        }
    }
}

impl ProgramPatch {
    /// Field limits plus reference checks: the sector must exist and the
    /// coordinator must be a program-coordinator user.
    async fn validate(&self, pool: &SqlitePool) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(codigo) = &self.codigo {
            check_text(&mut errors, "codigo", codigo, CODIGO_MAX);
        }
        if let Some(nome) = &self.nome {
            check_text(&mut errors, "nome", nome, NOME_MAX);
        }
        if let Some(duracao) = &self.duracao {
            check_text(&mut errors, "duracao", duracao, DURACAO_MAX);
        }

        if let Some(setor) = self.setor {
            let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM setores WHERE id = ?)")
                .bind(setor)
                .fetch_one(pool)
                .await?;
            if !exists {
                errors.add("setor", format!("Invalid pk \"{setor}\" - object does not exist."));
            }
        }

        if let Some(Some(coordenador)) = self.coordenador {
            let role = sqlx::query_scalar::<_, String>("SELECT role FROM usuarios WHERE id = ?")
                .bind(coordenador)
                .fetch_optional(pool)
                .await?;
            match role {
                None => errors.add(
                    "coordenador",
                    format!("Invalid pk \"{coordenador}\" - object does not exist."),
                ),
                Some(role) if role != Role::ProgramCoordinator.as_str() => errors.add(
                    "coordenador",
                    "User must have the coordenador_programa role.",
                ),
                Some(_) => {}
            }
        }

        errors.into_result()
    }
}

pub async fn fetch(pool: &SqlitePool, id: i64) -> ApiResult<ProgramResponse> {
    let sql = format!("{PROGRAM_SELECT} WHERE p.id = ?");
    sqlx::query_as::<_, ProgramResponse>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Program"))
}

/// List programs with sector and coordinator names
#[utoipa::path(
    get,
    path = "/api/programas",
    responses(
        (status = 200, description = "All programs", body = [ProgramResponse]),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Organisation"
)]
pub async fn list_programs(_auth: AuthUser, pool: web::Data<SqlitePool>) -> ApiResult<impl Responder> {
    let sql = format!("{PROGRAM_SELECT} ORDER BY p.codigo");
    let programs = sqlx::query_as::<_, ProgramResponse>(&sql)
        .fetch_all(pool.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(programs))
}

/// Create a program
#[utoipa::path(
    post,
    path = "/api/programas",
    request_body = ProgramPayload,
    responses(
        (status = 201, description = "Program created", body = ProgramResponse),
        (status = 400, description = "Invalid fields or references", body = ErrorBody),
        (status = 409, description = "Program code already in use", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Organisation"
)]
pub async fn create_program(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<ProgramPayload>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let patch = ProgramPatch::from(payload.into_inner());
    patch.validate(pool.get_ref()).await?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO programas (codigo, nome, duracao, setor_id, coordenador_id)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(patch.codigo.as_deref().map(str::trim))
    .bind(patch.nome.as_deref().map(str::trim))
    .bind(patch.duracao.as_deref().map(str::trim))
    .bind(patch.setor)
    .bind(patch.coordenador.flatten())
    .fetch_one(pool.get_ref())
    .await?;

    info!(programa_id = id, "Program created");
    Ok(HttpResponse::Created().json(fetch(pool.get_ref(), id).await?))
}

/// Get a program
#[utoipa::path(
    get,
    path = "/api/programas/{id}",
    params(("id" = i64, Path, description = "Program id")),
    responses(
        (status = 200, description = "Program found", body = ProgramResponse),
        (status = 404, description = "Program not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Organisation"
)]
pub async fn get_program(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<impl Responder> {
    Ok(HttpResponse::Ok().json(fetch(pool.get_ref(), path.into_inner()).await?))
}

async fn apply_patch(pool: &SqlitePool, id: i64, patch: ProgramPatch) -> ApiResult<ProgramResponse> {
    fetch(pool, id).await?;
    patch.validate(pool).await?;

    let mut update = SqlUpdate::new("programas");
    update
        .set_some("codigo", patch.codigo.as_deref().map(str::trim))
        .set_some("nome", patch.nome.as_deref().map(str::trim))
        .set_some("duracao", patch.duracao.as_deref().map(str::trim))
        .set_some("setor_id", patch.setor)
        .set_some("coordenador_id", patch.coordenador);
    update.execute(pool, "id", id).await?;

    debug!(programa_id = id, "Program updated");
    fetch(pool, id).await
}

/// Replace a program
#[utoipa::path(
    put,
    path = "/api/programas/{id}",
    params(("id" = i64, Path, description = "Program id")),
    request_body = ProgramPayload,
    responses(
        (status = 200, description = "Program updated", body = ProgramResponse),
        (status = 400, description = "Invalid fields or references", body = ErrorBody),
        (status = 404, description = "Program not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Organisation"
)]
pub async fn update_program(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<ProgramPayload>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let program = apply_patch(pool.get_ref(), path.into_inner(), payload.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(program))
}

/// Partially update a program
#[utoipa::path(
    patch,
    path = "/api/programas/{id}",
    params(("id" = i64, Path, description = "Program id")),
    request_body = ProgramPatch,
    responses(
        (status = 200, description = "Program updated", body = ProgramResponse),
        (status = 404, description = "Program not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Organisation"
)]
pub async fn patch_program(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<ProgramPatch>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let program = apply_patch(pool.get_ref(), path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(program))
}

/// Delete a program and its classes
#[utoipa::path(
    delete,
    path = "/api/programas/{id}",
    params(("id" = i64, Path, description = "Program id")),
    responses(
        (status = 204, description = "Program and its classes deleted"),
        (status = 404, description = "Program not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Organisation"
)]
pub async fn delete_program(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let id = path.into_inner();

    let result = sqlx::query("DELETE FROM programas WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Program"));
    }

    info!(programa_id = id, "Program deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use crate::model::role::Role;
    use crate::test_support::{
        TestContext, call, delete, get, init_app, patch_json, post_json, seed_program, seed_sector, seed_turma,
        seed_user,
    };
    use actix_web::http::StatusCode;
    use serde_json::json;

    #[actix_web::test]
    async fn read_shape_names_sector_and_coordinator() {
        let ctx = TestContext::new().await;
        let staff = seed_user(&ctx, Role::Secretary, "600").await;
        let coordinator = seed_user(&ctx, Role::ProgramCoordinator, "601").await;
        let token = ctx.token(staff, Role::Secretary);
        let setor = seed_sector(&ctx, "Hospital A").await;
        let app = init_app(&ctx).await;

        let (status, created) = call(
            &app,
            post_json(
                "/api/programas/",
                Some(&token),
                json!({
                    "codigo": "P001", "nome": "Clínica Médica", "duracao": "2 anos",
                    "setor": setor, "coordenador": coordinator,
                    "setor_nome": "ignored"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["setor"], setor);
        assert_eq!(created["setor_nome"], "Hospital A");
        assert_eq!(created["coordenador"], coordinator);
        assert_eq!(created["coordenador_nome"], "Nome Teste");

        let (_, list) = call(&app, get("/api/programas", Some(&token))).await;
        assert_eq!(list[0]["codigo"], "P001");
    }

    #[actix_web::test]
    async fn coordinator_must_have_program_coordinator_role() {
        let ctx = TestContext::new().await;
        let staff = seed_user(&ctx, Role::Secretary, "610").await;
        let preceptor = seed_user(&ctx, Role::Preceptor, "611").await;
        let token = ctx.token(staff, Role::Secretary);
        let setor = seed_sector(&ctx, "Hospital A").await;
        let app = init_app(&ctx).await;

        let (status, body) = call(
            &app,
            post_json(
                "/api/programas",
                Some(&token),
                json!({"codigo": "P001", "nome": "CM", "duracao": "2", "setor": setor, "coordenador": preceptor}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"]["coordenador"].is_array());
        assert_eq!(ctx.count("programas").await, 0);
    }

    #[actix_web::test]
    async fn missing_sector_and_duplicate_code() {
        let ctx = TestContext::new().await;
        let staff = seed_user(&ctx, Role::Secretary, "620").await;
        let token = ctx.token(staff, Role::Secretary);
        let setor = seed_sector(&ctx, "Hospital A").await;
        seed_program(&ctx, setor, "P001").await;
        let app = init_app(&ctx).await;

        let (status, body) = call(
            &app,
            post_json(
                "/api/programas",
                Some(&token),
                json!({"codigo": "P002", "nome": "CM", "duracao": "2", "setor": 999}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"]["setor"].is_array());

        let (status, body) = call(
            &app,
            post_json(
                "/api/programas",
                Some(&token),
                json!({"codigo": "P001", "nome": "CM", "duracao": "2", "setor": setor}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["details"]["fields"][0], "codigo");
    }

    #[actix_web::test]
    async fn deleting_program_removes_its_classes() {
        let ctx = TestContext::new().await;
        let staff = seed_user(&ctx, Role::Secretary, "630").await;
        let token = ctx.token(staff, Role::Secretary);
        let setor = seed_sector(&ctx, "Hospital A").await;
        let programa = seed_program(&ctx, setor, "P001").await;
        let turma = seed_turma(&ctx, programa, "T1").await;
        let app = init_app(&ctx).await;

        let (status, _) = call(&app, delete(&format!("/api/programas/{programa}"), Some(&token))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&app, get(&format!("/api/turmas/{turma}"), Some(&token))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(ctx.count("turmas").await, 0);
    }

    #[actix_web::test]
    async fn patch_can_clear_coordinator() {
        let ctx = TestContext::new().await;
        let staff = seed_user(&ctx, Role::Secretary, "640").await;
        let coordinator = seed_user(&ctx, Role::ProgramCoordinator, "641").await;
        let token = ctx.token(staff, Role::Secretary);
        let setor = seed_sector(&ctx, "Hospital A").await;
        let programa = seed_program(&ctx, setor, "P001").await;
        let app = init_app(&ctx).await;

        let uri = format!("/api/programas/{programa}");
        let (_, body) = call(&app, patch_json(&uri, Some(&token), json!({"coordenador": coordinator}))).await;
        assert_eq!(body["coordenador"], coordinator);

        let (_, body) = call(&app, patch_json(&uri, Some(&token), json!({"nome": "Cirurgia"}))).await;
        assert_eq!(body["coordenador"], coordinator);
        assert_eq!(body["nome"], "Cirurgia");

        let (_, body) = call(&app, patch_json(&uri, Some(&token), json!({"coordenador": null}))).await;
        assert!(body["coordenador"].is_null());
        assert!(body["coordenador_nome"].is_null());
    }

    #[actix_web::test]
    async fn deleting_coordinator_user_nulls_program_link() {
        let ctx = TestContext::new().await;
        let coordinator = seed_user(&ctx, Role::ProgramCoordinator, "650").await;
        let setor = seed_sector(&ctx, "Hospital A").await;
        let programa = seed_program(&ctx, setor, "P001").await;
        sqlx::query("UPDATE programas SET coordenador_id = ? WHERE id = ?")
            .bind(coordinator)
            .bind(programa)
            .execute(&ctx.pool)
            .await
            .unwrap();

        sqlx::query("DELETE FROM usuarios WHERE id = ?")
            .bind(coordinator)
            .execute(&ctx.pool)
            .await
            .unwrap();

        let link = sqlx::query_scalar::<_, Option<i64>>("SELECT coordenador_id FROM programas WHERE id = ?")
            .bind(programa)
            .fetch_one(&ctx.pool)
            .await
            .unwrap();
        assert_eq!(link, None);
    }
}
