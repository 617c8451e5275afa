use crate::{
    auth::{
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
    },
    config::Config,
    error::{ApiError, ApiResult, ErrorBody},
    models::{LoginReqDto, RefreshReqDto, TokenPair, TokenType, UserSql},
};
use actix_web::{HttpResponse, Responder, web};
use sqlx::SqlitePool;
use tracing::{debug, error, info, instrument};

/// Resolves `cpf` against stored users and checks the secret.
///
/// `None` for an unknown CPF, an inactive user or a wrong password alike;
/// callers cannot tell which one happened.
pub async fn authenticate_by_cpf(
    pool: &SqlitePool,
    cpf: &str,
    password: &str,
) -> Result<Option<UserSql>, sqlx::Error> {
    let user = sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, cpf, password, role, is_active
        FROM usuarios
        WHERE cpf = ?
        "#,
    )
    .bind(cpf.trim())
    .fetch_optional(pool)
    .await?;

    let Some(user) = user else {
        info!("Invalid credentials: CPF not found");
        return Ok(None);
    };

    if !user.is_active {
        info!(user_id = user.id, "Invalid credentials: user inactive");
        return Ok(None);
    }

    if let Err(e) = verify_password(password, &user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Ok(None);
    }

    Ok(Some(user))
}

async fn issue_pair(
    pool: &SqlitePool,
    config: &Config,
    user_id: i64,
    cpf: &str,
    role: &str,
) -> ApiResult<TokenPair> {
    let access = generate_access_token(
        user_id,
        cpf.to_string(),
        role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign access token");
        ApiError::Internal
    })?;

    let (refresh, refresh_claims) = generate_refresh_token(
        user_id,
        cpf.to_string(),
        role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign refresh token");
        ApiError::Internal
    })?;

    debug!(user_id, jti = %refresh_claims.jti, "Storing refresh token");

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await?;

    Ok(TokenPair { access, refresh })
}

/// Obtain a token pair with CPF + password
#[utoipa::path(
    post,
    path = "/api/token",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair issued", body = TokenPair),
        (status = 400, description = "Missing identifier or password", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, user))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> ApiResult<impl Responder> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty CPF or password");
        return Err(ApiError::validation(
            "non_field_errors",
            "CPF and password are required",
        ));
    }

    let Some(db_user) = authenticate_by_cpf(pool.get_ref(), &user.username, &user.password).await?
    else {
        return Err(ApiError::Unauthorized);
    };

    let pair = issue_pair(
        pool.get_ref(),
        &config,
        db_user.id,
        &db_user.cpf,
        &db_user.role,
    )
    .await?;

    // non-fatal: a missed stamp only affects cache warmup
    if let Err(e) = sqlx::query("UPDATE usuarios SET last_login_at = datetime('now') WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = db_user.id, "Login successful");

    Ok(HttpResponse::Ok().json(pair))
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/api/token/refresh",
    request_body = RefreshReqDto,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Refresh token invalid, expired or revoked", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn refresh_token(
    body: web::Json<RefreshReqDto>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> ApiResult<impl Responder> {
    let claims = verify_token(&body.refresh, &config.jwt_secret).map_err(|_| ApiError::Unauthorized)?;

    if claims.token_type != TokenType::Refresh {
        return Err(ApiError::Unauthorized);
    }

    let mut tx = pool.begin().await?;

    // revoke the old token; 0 rows means unknown or already revoked
    let revoked = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ? AND revoked = 0")
        .bind(&claims.jti)
        .execute(&mut *tx)
        .await?;

    if revoked.rows_affected() == 0 {
        return Err(ApiError::Unauthorized);
    }

    // CPF and role may have changed since the old token, take the stored ones
    let (cpf, role) =
        sqlx::query_as::<_, (String, String)>("SELECT cpf, role FROM usuarios WHERE id = ? AND is_active = 1")
            .bind(claims.user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ApiError::Unauthorized)?;

    tx.commit().await?;

    let pair = issue_pair(pool.get_ref(), &config, claims.user_id, &cpf, &role).await?;

    Ok(HttpResponse::Ok().json(pair))
}

/// Revoke a refresh token
#[utoipa::path(
    post,
    path = "/api/token/logout",
    request_body = RefreshReqDto,
    responses(
        (status = 204, description = "Refresh token revoked (or was never valid)")
    ),
    tag = "Auth"
)]
pub async fn logout(
    body: web::Json<RefreshReqDto>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> impl Responder {
    let claims = match verify_token(&body.refresh, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    // idempotent
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().finish()
}
