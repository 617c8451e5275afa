use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde::Serialize;
use serde_json::{Value, json};
use sqlx::error::ErrorKind;
use std::collections::BTreeMap;
use tracing::error;
use utoipa::ToSchema;

pub type ApiResult<T> = Result<T, ApiError>;

/// Field name -> messages, the shape clients get under `details`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> ApiResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "Validation failed")]
    Validation(FieldErrors),

    #[display(fmt = "{}", message)]
    Conflict { message: String, fields: Vec<String> },

    #[display(fmt = "Cannot delete: record has dependent {}", dependents)]
    ProtectedDelete { dependents: &'static str, count: i64 },

    #[display(fmt = "Authentication credentials were not provided or are invalid")]
    Unauthorized,

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "Internal Server Error")]
    Internal,
}

impl std::error::Error for ApiError {}

/// Error body returned by every endpoint.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "Validation failed")]
    pub message: String,
    #[schema(example = "invalid_request")]
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub details: Option<Value>,
}

impl ApiError {
    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn conflict_on(field: &str, message: impl Into<String>) -> Self {
        ApiError::Conflict {
            message: message.into(),
            fields: vec![field.to_string()],
        }
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(FieldErrors::single(field, message))
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "invalid_request",
            ApiError::Conflict { .. } => "conflict",
            ApiError::ProtectedDelete { .. } => "protected",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal => "internal_error",
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            ApiError::Validation(errors) => Some(json!(errors)),
            ApiError::Conflict { fields, .. } if !fields.is_empty() => {
                Some(json!({ "fields": fields }))
            }
            ApiError::ProtectedDelete { dependents, count } => {
                Some(json!({ "dependents": dependents, "count": count }))
            }
            _ => None,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict { .. } | ApiError::ProtectedDelete { .. } => StatusCode::CONFLICT,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            message: self.to_string(),
            code: self.code().to_string(),
            details: self.details(),
        })
    }
}

/// Columns named in a SQLite constraint message, e.g.
/// `UNIQUE constraint failed: jornadas.residente_id, jornadas.data`.
fn constraint_columns(message: &str) -> Vec<String> {
    message
        .split_once("constraint failed:")
        .map(|(_, cols)| {
            cols.split(',')
                .filter_map(|col| col.trim().rsplit('.').next())
                .filter(|col| !col.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation => ApiError::Conflict {
                    message: "A record with these values already exists".to_string(),
                    fields: constraint_columns(db_err.message()),
                },
                ErrorKind::ForeignKeyViolation => ApiError::validation(
                    "non_field_errors",
                    "Referenced record does not exist or is still in use",
                ),
                _ => {
                    error!(error = %err, "Database error");
                    ApiError::Internal
                }
            },
            _ => {
                error!(error = %err, "Database error");
                ApiError::Internal
            }
        }
    }
}

impl From<actix_web::error::JsonPayloadError> for ApiError {
    fn from(err: actix_web::error::JsonPayloadError) -> Self {
        ApiError::validation("non_field_errors", err.to_string())
    }
}

impl From<actix_web::error::QueryPayloadError> for ApiError {
    fn from(err: actix_web::error::QueryPayloadError) -> Self {
        ApiError::validation("query", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn unique_message_yields_column_names() {
        assert_eq!(
            constraint_columns("UNIQUE constraint failed: jornadas.residente_id, jornadas.data"),
            vec!["residente_id".to_string(), "data".to_string()]
        );
        assert_eq!(
            constraint_columns("UNIQUE constraint failed: usuarios.cpf"),
            vec!["cpf".to_string()]
        );
        assert!(constraint_columns("disk I/O error").is_empty());
    }

    #[test]
    fn empty_field_errors_are_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
        let mut errors = FieldErrors::new();
        errors.add("cpf", "too long");
        assert!(matches!(errors.into_result(), Err(ApiError::Validation(_))));
    }

    #[actix_web::test]
    async fn protected_delete_names_dependents() {
        let err = ApiError::ProtectedDelete {
            dependents: "programas",
            count: 2,
        };
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = to_bytes(response.into_body()).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["code"], "protected");
        assert_eq!(value["details"]["dependents"], "programas");
        assert_eq!(value["details"]["count"], 2);
    }

    #[actix_web::test]
    async fn unauthorized_has_no_details() {
        let response = ApiError::Unauthorized.error_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body()).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["code"], "unauthorized");
        assert!(value.get("details").is_none());
    }
}
