use crate::{
    auth::auth::AuthUser,
    error::{ApiError, ApiResult, ErrorBody, FieldErrors},
    model::{
        profile::{Profile, ProfileFields},
        role::Role,
        user::{USER_COLUMNS, UserResponse},
    },
    services::user_service::{self, NewUser},
    utils::cpf_registry::CpfRegistry,
};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

/// Generic onboarding: user fields, a role and whatever that role's profile
/// needs, all in one body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UserPayload {
    #[serde(flatten)]
    pub user: NewUser,
    pub role: Role,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

async fn fetch(pool: &SqlitePool, id: i64) -> Result<Option<UserResponse>, sqlx::Error> {
    let sql = format!("SELECT {USER_COLUMNS} FROM usuarios WHERE id = ?");
    sqlx::query_as::<_, UserResponse>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// List users
#[utoipa::path(
    get,
    path = "/api/usuarios",
    responses(
        (status = 200, description = "All users", body = [UserResponse]),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "People"
)]
pub async fn list_users(_auth: AuthUser, pool: web::Data<SqlitePool>) -> ApiResult<impl Responder> {
    let sql = format!("SELECT {USER_COLUMNS} FROM usuarios ORDER BY id");
    let users = sqlx::query_as::<_, UserResponse>(&sql)
        .fetch_all(pool.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(users))
}

/// Create a user of any role together with its profile
#[utoipa::path(
    post,
    path = "/api/usuarios",
    request_body = UserPayload,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid user or profile fields", body = ErrorBody),
        (status = 409, description = "CPF or username already registered", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "People"
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    registry: web::Data<CpfRegistry>,
    payload: web::Json<UserPayload>,
) -> ApiResult<impl Responder> {
    auth.require_staff()?;
    let payload = payload.into_inner();

    let mut errors = FieldErrors::new();
    payload.user.validate(&mut errors);
    let profile = Profile::from_fields(payload.role, payload.profile, &mut errors);
    errors.into_result()?;

    let id = user_service::onboard(
        pool.get_ref(),
        &registry,
        &payload.user,
        payload.role,
        profile.as_ref(),
    )
    .await?;

    let user = fetch(pool.get_ref(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(HttpResponse::Created().json(user))
}

/// The caller's own identity
#[utoipa::path(
    get,
    path = "/api/usuarios/me",
    responses(
        (status = 200, description = "Authenticated user", body = UserResponse),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "People"
)]
pub async fn me(auth: AuthUser, pool: web::Data<SqlitePool>) -> ApiResult<impl Responder> {
    // A valid token can outlive its user.
    let user = fetch(pool.get_ref(), auth.user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(HttpResponse::Ok().json(user))
}

#[cfg(test)]
mod tests {
    use crate::model::role::Role;
    use crate::test_support::{TestContext, call, get, init_app, post_json, seed_user};
    use actix_web::http::StatusCode;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn payload(cpf: &str, role: &str, extra: Value) -> Value {
        let mut body = json!({
            "username": format!("u{cpf}"),
            "password": "segredo",
            "first_name": "Joana",
            "last_name": "Prado",
            "email": "joana@hospital.org",
            "cpf": cpf,
            "role": role,
        });
        if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            body.extend(extra.clone());
        }
        body
    }

    #[rstest]
    #[case("secretario", json!({}), "perfil_secretario")]
    #[case("tutor", json!({"especialidade": "Pediatria"}), "perfil_tutor")]
    #[case("preceptor", json!({"especialidade": "Pediatria"}), "perfil_preceptor")]
    #[case("coordenador_geral", json!({"titulo": "Diretor"}), "perfil_coordenador_geral")]
    #[case("coordenador_programa", json!({}), "perfil_coordenador_programa")]
    #[actix_web::test]
    async fn onboarding_by_role_stores_matching_profile(
        #[case] role: &str,
        #[case] extra: Value,
        #[case] table: &str,
    ) {
        let ctx = TestContext::new().await;
        let staff = seed_user(&ctx, Role::GeneralCoordinator, "1100").await;
        let token = ctx.token(staff, Role::GeneralCoordinator);
        let app = init_app(&ctx).await;
        let before = ctx.count(table).await;

        let (status, body) = call(&app, post_json("/api/usuarios", Some(&token), payload("1101", role, extra))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["role"], role);
        assert!(body.get("password").is_none());
        assert_eq!(ctx.count(table).await, before + 1);
    }

    #[actix_web::test]
    async fn resident_user_gets_no_profile_yet() {
        let ctx = TestContext::new().await;
        let staff = seed_user(&ctx, Role::Secretary, "1110").await;
        let token = ctx.token(staff, Role::Secretary);
        let app = init_app(&ctx).await;

        let (status, _) = call(
            &app,
            post_json("/api/usuarios", Some(&token), payload("1111", "residente", json!({}))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(ctx.count("perfil_residente").await, 0);
    }

    #[actix_web::test]
    async fn unknown_role_is_rejected() {
        let ctx = TestContext::new().await;
        let staff = seed_user(&ctx, Role::Secretary, "1120").await;
        let token = ctx.token(staff, Role::Secretary);
        let app = init_app(&ctx).await;

        let (status, _) = call(
            &app,
            post_json("/api/usuarios", Some(&token), payload("1121", "admin", json!({}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(ctx.count("usuarios").await, 1);
    }

    #[actix_web::test]
    async fn residents_cannot_onboard_users() {
        let ctx = TestContext::new().await;
        let resident = seed_user(&ctx, Role::Resident, "1130").await;
        let token = ctx.token(resident, Role::Resident);
        let app = init_app(&ctx).await;

        let (status, _) = call(
            &app,
            post_json("/api/usuarios", Some(&token), payload("1131", "secretario", json!({}))),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn me_returns_own_identity_only_when_authenticated() {
        let ctx = TestContext::new().await;
        let resident = seed_user(&ctx, Role::Resident, "1140").await;
        let token = ctx.token(resident, Role::Resident);
        let app = init_app(&ctx).await;

        let (status, _) = call(&app, get("/api/usuarios/me/", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(&app, get("/api/usuarios/me/", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], resident);
        assert_eq!(body["cpf"], "1140");
        assert_eq!(body["role"], "residente");
        assert!(body["telefone"].is_null());

        sqlx::query("DELETE FROM usuarios WHERE id = ?")
            .bind(resident)
            .execute(&ctx.pool)
            .await
            .unwrap();
        let (status, _) = call(&app, get("/api/usuarios/me", Some(&token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
