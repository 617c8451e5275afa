//! Shared fixtures for handler and service tests.

use crate::auth::jwt::generate_access_token;
use crate::auth::password::hash_password;
use crate::config::Config;
use crate::model::role::Role;
use crate::routes;
use crate::utils::cpf_registry::CpfRegistry;
use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, test};
use once_cell::sync::Lazy;
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

pub const TEST_PASSWORD: &str = "s3nha-forte";

static TEST_PASSWORD_HASH: Lazy<String> =
    Lazy::new(|| hash_password(TEST_PASSWORD).expect("hash test password"));

pub struct TestContext {
    pub pool: SqlitePool,
    pub config: Config,
    pub registry: CpfRegistry,
}

impl TestContext {
    pub async fn new() -> Self {
        // one connection keeps the in-memory database alive and shared
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .expect("memory url")
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .expect("connect in-memory sqlite");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("run migrations");

        Self {
            pool,
            config: test_config(),
            registry: CpfRegistry::new(),
        }
    }

    pub fn token(&self, user_id: i64, role: Role) -> String {
        generate_access_token(
            user_id,
            format!("cpf-{user_id}"),
            role.as_str(),
            &self.config.jwt_secret,
            self.config.access_token_ttl,
        )
        .expect("sign test token")
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .expect("count rows")
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".into(),
        jwt_secret: "test-secret".into(),
        server_addr: "127.0.0.1:0".into(),
        access_token_ttl: 900,
        refresh_token_ttl: 3600,
        rate_login_per_min: 1000,
        rate_protected_per_min: 10_000,
        api_prefix: "/api".into(),
        log_dir: "logs".into(),
    }
}

/// Inserts a user with `role` plus the profile row that role needs to be
/// referenced (residents get none, see [`seed_resident`]).
pub async fn seed_user(ctx: &TestContext, role: Role, cpf: &str) -> i64 {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO usuarios (username, password, first_name, last_name, email, cpf, role)
        VALUES (?, ?, 'Nome', 'Teste', 'teste@hospital.org', ?, ?)
        RETURNING id
        "#,
    )
    .bind(format!("user{cpf}"))
    .bind(TEST_PASSWORD_HASH.as_str())
    .bind(cpf)
    .bind(role.as_str())
    .fetch_one(&ctx.pool)
    .await
    .expect("insert user");

    let profile_sql = match role {
        Role::Secretary => Some("INSERT INTO perfil_secretario (usuario_id) VALUES (?)"),
        Role::Preceptor => Some(
            "INSERT INTO perfil_preceptor (usuario_id, especialidade) VALUES (?, 'Clínica Geral')",
        ),
        Role::Tutor => {
            Some("INSERT INTO perfil_tutor (usuario_id, especialidade) VALUES (?, 'Clínica Geral')")
        }
        Role::GeneralCoordinator => {
            Some("INSERT INTO perfil_coordenador_geral (usuario_id, titulo) VALUES (?, 'Coordenador Geral')")
        }
        Role::ProgramCoordinator => {
            Some("INSERT INTO perfil_coordenador_programa (usuario_id) VALUES (?)")
        }
        Role::Resident => None,
    };

    if let Some(sql) = profile_sql {
        sqlx::query(sql)
            .bind(id)
            .execute(&ctx.pool)
            .await
            .expect("insert profile");
    }

    ctx.registry.mark_taken(cpf).await;
    id
}

pub async fn seed_resident(ctx: &TestContext, cpf: &str, matricula: &str, turma: Option<i64>) -> i64 {
    let id = seed_user(ctx, Role::Resident, cpf).await;
    sqlx::query("INSERT INTO perfil_residente (usuario_id, matricula, turma_id) VALUES (?, ?, ?)")
        .bind(id)
        .bind(matricula)
        .bind(turma)
        .execute(&ctx.pool)
        .await
        .expect("insert resident profile");
    id
}

pub async fn seed_sector(ctx: &TestContext, nome: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("INSERT INTO setores (nome, endereco) VALUES (?, 'Rua A') RETURNING id")
        .bind(nome)
        .fetch_one(&ctx.pool)
        .await
        .expect("insert sector")
}

pub async fn seed_program(ctx: &TestContext, setor: i64, codigo: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO programas (codigo, nome, duracao, setor_id) VALUES (?, 'Clínica Médica', '2 anos', ?) RETURNING id",
    )
    .bind(codigo)
    .bind(setor)
    .fetch_one(&ctx.pool)
    .await
    .expect("insert program")
}

pub async fn seed_turma(ctx: &TestContext, programa: i64, codigo: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("INSERT INTO turmas (codigo, programa_id) VALUES (?, ?) RETURNING id")
        .bind(codigo)
        .bind(programa)
        .fetch_one(&ctx.pool)
        .await
        .expect("insert turma")
}

pub async fn init_app(
    ctx: &TestContext,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
    let config = ctx.config.clone();
    test::init_service(
        App::new()
            .wrap(NormalizePath::trim())
            .app_data(Data::new(ctx.pool.clone()))
            .app_data(Data::new(ctx.config.clone()))
            .app_data(Data::new(ctx.registry.clone()))
            .configure(move |cfg| routes::configure(cfg, config)),
    )
    .await
}

fn with_auth(req: test::TestRequest, token: Option<&str>) -> test::TestRequest {
    let req = req.peer_addr("127.0.0.1:40000".parse().expect("peer addr"));
    match token {
        Some(token) => req.insert_header(("Authorization", format!("Bearer {token}"))),
        None => req,
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request {
    with_auth(test::TestRequest::get().uri(uri), token).to_request()
}

pub fn delete(uri: &str, token: Option<&str>) -> Request {
    with_auth(test::TestRequest::delete().uri(uri), token).to_request()
}

pub fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request {
    with_auth(test::TestRequest::post().uri(uri), token)
        .set_json(body)
        .to_request()
}

pub fn put_json(uri: &str, token: Option<&str>, body: Value) -> Request {
    with_auth(test::TestRequest::put().uri(uri), token)
        .set_json(body)
        .to_request()
}

pub fn patch_json(uri: &str, token: Option<&str>, body: Value) -> Request {
    with_auth(test::TestRequest::patch().uri(uri), token)
        .set_json(body)
        .to_request()
}

/// Status plus parsed JSON body (`Value::Null` for empty bodies).
pub async fn call<S, B>(app: &S, req: Request) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("json body")
    };
    (status, value)
}
