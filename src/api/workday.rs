use crate::{
    auth::auth::AuthUser,
    error::{ApiError, ApiResult, ErrorBody},
    model::workday::{ActivityResponse, PunchResponse, WorkdayResponse, WorkdayRow},
    services::workday_service::{
        self, NewActivity, NewPunch, NewWorkday, ValidateWorkday, WorkdayFilter, WorkdayListResponse,
    },
};
use actix_web::{HttpResponse, Responder, web};
use sqlx::SqlitePool;

/// Owner or staff may change a workday's evidence.
fn ensure_can_edit(auth: &AuthUser, row: &WorkdayRow) -> ApiResult<()> {
    if auth.role.is_staff() || (auth.is_resident() && row.residente == auth.user_id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Only the resident or staff may change this workday".to_string(),
        ))
    }
}

/// Residents do not learn about other residents' workdays.
async fn visible_row(pool: &SqlitePool, auth: &AuthUser, id: i64) -> ApiResult<WorkdayRow> {
    match workday_service::find_row(pool, id).await? {
        Some(row) if !auth.is_resident() || row.residente == auth.user_id => Ok(row),
        _ => Err(ApiError::not_found("Workday")),
    }
}

/// List workdays
#[utoipa::path(
    get,
    path = "/api/jornadas",
    params(WorkdayFilter),
    responses(
        (status = 200, description = "Workdays, newest date first", body = WorkdayListResponse),
        (status = 400, description = "Invalid filter", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_workdays(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<WorkdayFilter>,
) -> ApiResult<impl Responder> {
    let only_resident = auth.is_resident().then_some(auth.user_id);
    let page = workday_service::list_workdays(pool.get_ref(), &query, only_resident).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Register a workday with its activities and punches
#[utoipa::path(
    post,
    path = "/api/jornadas",
    request_body = NewWorkday,
    responses(
        (status = 201, description = "Workday created", body = WorkdayResponse),
        (status = 400, description = "Invalid fields or resident", body = ErrorBody),
        (status = 403, description = "Caller may not register for this resident", body = ErrorBody),
        (status = 409, description = "Workday already exists for that date", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn create_workday(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<NewWorkday>,
) -> ApiResult<impl Responder> {
    let residente = if auth.is_resident() {
        match payload.residente {
            Some(other) if other != auth.user_id => {
                return Err(ApiError::Forbidden(
                    "Residents may only register their own workdays".to_string(),
                ));
            }
            _ => auth.user_id,
        }
    } else if auth.role.is_staff() {
        payload
            .residente
            .ok_or_else(|| ApiError::validation("residente", "This field is required."))?
    } else {
        return Err(ApiError::Forbidden(
            "Only residents or staff may register workdays".to_string(),
        ));
    };

    let id = workday_service::create_workday(pool.get_ref(), residente, &payload).await?;
    let workday = workday_service::load_workday(pool.get_ref(), id).await?;
    Ok(HttpResponse::Created().json(workday))
}

/// Get a workday with its activities and punches
#[utoipa::path(
    get,
    path = "/api/jornadas/{id}",
    params(("id" = i64, Path, description = "Workday id")),
    responses(
        (status = 200, description = "Workday found", body = WorkdayResponse),
        (status = 404, description = "Workday not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn get_workday(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<impl Responder> {
    let row = visible_row(pool.get_ref(), &auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(workday_service::load_workday(pool.get_ref(), row.id).await?))
}

/// Delete a pending workday
#[utoipa::path(
    delete,
    path = "/api/jornadas/{id}",
    params(("id" = i64, Path, description = "Workday id")),
    responses(
        (status = 204, description = "Workday deleted"),
        (status = 404, description = "Workday not found", body = ErrorBody),
        (status = 409, description = "Workday already validated", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn delete_workday(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<impl Responder> {
    let row = visible_row(pool.get_ref(), &auth, path.into_inner()).await?;
    ensure_can_edit(&auth, &row)?;
    workday_service::delete_workday(pool.get_ref(), row.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Approve, reject or justify a pending workday
#[utoipa::path(
    post,
    path = "/api/jornadas/{id}/validar",
    params(("id" = i64, Path, description = "Workday id")),
    request_body = ValidateWorkday,
    responses(
        (status = 200, description = "Workday validated", body = WorkdayResponse),
        (status = 400, description = "Target status is not a decision", body = ErrorBody),
        (status = 403, description = "Preceptor only", body = ErrorBody),
        (status = 404, description = "Workday not found", body = ErrorBody),
        (status = 409, description = "Workday already validated", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn validate_workday(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<ValidateWorkday>,
) -> ApiResult<impl Responder> {
    auth.require_preceptor()?;
    let workday =
        workday_service::validate_workday(pool.get_ref(), path.into_inner(), auth.user_id, &payload).await?;
    Ok(HttpResponse::Ok().json(workday))
}

/// Add an activity to a pending workday
#[utoipa::path(
    post,
    path = "/api/jornadas/{id}/atividades",
    params(("id" = i64, Path, description = "Workday id")),
    request_body = NewActivity,
    responses(
        (status = 201, description = "Activity added", body = ActivityResponse),
        (status = 404, description = "Workday not found", body = ErrorBody),
        (status = 409, description = "Workday already validated", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn add_activity(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<NewActivity>,
) -> ApiResult<impl Responder> {
    let row = visible_row(pool.get_ref(), &auth, path.into_inner()).await?;
    ensure_can_edit(&auth, &row)?;
    let activity = workday_service::add_activity(pool.get_ref(), row.id, &payload).await?;
    Ok(HttpResponse::Created().json(activity))
}

/// Add a punch to an activity of a pending workday
#[utoipa::path(
    post,
    path = "/api/atividades/{id}/pontos",
    params(("id" = i64, Path, description = "Activity id")),
    request_body = NewPunch,
    responses(
        (status = 201, description = "Punch added", body = PunchResponse),
        (status = 404, description = "Activity not found", body = ErrorBody),
        (status = 409, description = "Workday already validated", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn add_punch(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<NewPunch>,
) -> ApiResult<impl Responder> {
    let atividade_id = path.into_inner();
    let row = match workday_service::activity_workday(pool.get_ref(), atividade_id).await? {
        Some(row) if !auth.is_resident() || row.residente == auth.user_id => row,
        _ => return Err(ApiError::not_found("Activity")),
    };
    ensure_can_edit(&auth, &row)?;
    let punch = workday_service::add_punch(pool.get_ref(), atividade_id, &payload).await?;
    Ok(HttpResponse::Created().json(punch))
}
