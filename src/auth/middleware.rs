use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::role::Role;
use crate::models::TokenType;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::AUTHORIZATION,
    web::Data,
};
use std::str::FromStr;
use tracing::debug;

fn authenticate(req: &ServiceRequest) -> Option<AuthUser> {
    let config = req.app_data::<Data<Config>>()?;

    let token = req
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "Rejected bearer token");
            return None;
        }
    };

    if claims.token_type != TokenType::Access {
        return None;
    }

    let role = Role::from_str(&claims.role).ok()?;

    Some(AuthUser {
        user_id: claims.user_id,
        cpf: claims.sub,
        role,
    })
}

/// Every failure (missing header, bad scheme, bad signature, expired,
/// refresh token used as access token, unknown role) gets the same 401.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    match authenticate(&req) {
        Some(auth_user) => {
            req.extensions_mut().insert(auth_user);
            next.call(req).await
        }
        None => {
            let resp = ApiError::Unauthorized.error_response();
            Ok(req.into_response(resp))
        }
    }
}
