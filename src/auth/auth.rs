use crate::error::ApiError;
use crate::model::role::Role;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

/// Caller identity placed in request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub cpf: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or(ApiError::Unauthorized),
        )
    }
}

impl AuthUser {
    /// Secretary or coordinator.
    pub fn require_staff(&self) -> Result<(), ApiError> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Staff only".to_string()))
        }
    }

    pub fn require_preceptor(&self) -> Result<(), ApiError> {
        if self.role == Role::Preceptor {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Preceptor only".to_string()))
        }
    }

    pub fn is_resident(&self) -> bool {
        self.role == Role::Resident
    }
}
