use crate::{
    error::{ApiError, ApiResult, FieldErrors},
    model::workday::{
        ActivityResponse, ActivityRow, ActivityType, PunchResponse, PunchRow, PunchType, WORKDAY_COLUMNS,
        WorkdayResponse, WorkdayRow, WorkdayStatus,
    },
    utils::validation::check_max_len,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use std::str::FromStr;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

pub const DETALHE_MAX: usize = 200;
pub const JUSTIFICATIVA_MAX: usize = 1000;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewPunch {
    #[schema(example = "07:00:00", value_type = String, format = "time")]
    pub hora: NaiveTime,
    pub tipo: PunchType,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewActivity {
    pub tipo: ActivityType,
    #[schema(example = "Enfermaria")]
    pub detalhe: Option<String>,
    #[serde(default)]
    pub pontos: Vec<NewPunch>,
}

impl NewActivity {
    fn validate(&self, errors: &mut FieldErrors, field: &str) {
        if let Some(detalhe) = &self.detalhe {
            check_max_len(errors, field, detalhe, DETALHE_MAX);
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewWorkday {
    /// Resident user id. Residents may omit it, staff must send it.
    #[schema(example = 7)]
    pub residente: Option<i64>,
    #[schema(example = "2024-03-01", format = "date", value_type = String)]
    pub data: NaiveDate,
    pub justificativa_geral: Option<String>,
    /// At least one activity. More can be added while the workday is pending.
    #[serde(default)]
    pub atividades: Vec<NewActivity>,
}

impl NewWorkday {
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(justificativa) = &self.justificativa_geral {
            check_max_len(&mut errors, "justificativa_geral", justificativa, JUSTIFICATIVA_MAX);
        }
        if self.atividades.is_empty() {
            errors.add("atividades", "A workday needs at least one activity.");
        }
        for (i, atividade) in self.atividades.iter().enumerate() {
            atividade.validate(&mut errors, &format!("atividades[{i}].detalhe"));
        }
        errors.into_result()
    }
}

/// Validator decision on a whole workday.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ValidateWorkday {
    pub status: WorkdayStatus,
    pub observacao_validador: Option<String>,
    /// Replaces the stored justification only when supplied.
    pub justificativa_geral: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct WorkdayFilter {
    /// Filter by resident user id
    #[schema(example = 7)]
    pub residente: Option<i64>,
    /// Filter by the supervising preceptor of the resident
    #[schema(example = 3)]
    pub preceptor: Option<i64>,
    /// Filter by status tag
    #[schema(example = "pendente")]
    pub status: Option<String>,
    /// Filter by calendar date
    #[schema(example = "2024-03-01", format = "date", value_type = Option<String>)]
    #[param(value_type = Option<String>)]
    pub data: Option<NaiveDate>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u32>,
    /// Pagination per page number
    #[schema(example = 10)]
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WorkdayListResponse {
    pub data: Vec<WorkdayResponse>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

enum FilterValue {
    I64(i64),
    Text(String),
    Date(NaiveDate),
}

fn parse_tag<T: FromStr>(tag: &str, what: &str) -> ApiResult<T> {
    T::from_str(tag).map_err(|_| {
        error!(tag, what, "Stored tag is not a known value");
        ApiError::Internal
    })
}

async fn insert_activity(conn: &mut SqliteConnection, jornada_id: i64, activity: &NewActivity) -> ApiResult<i64> {
    let atividade_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO atividades (jornada_id, tipo, detalhe) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(jornada_id)
    .bind(activity.tipo.as_str())
    .bind(activity.detalhe.as_deref())
    .fetch_one(&mut *conn)
    .await?;

    for ponto in &activity.pontos {
        insert_punch(conn, atividade_id, ponto).await?;
    }

    Ok(atividade_id)
}

async fn insert_punch(conn: &mut SqliteConnection, atividade_id: i64, punch: &NewPunch) -> ApiResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO pontos (atividade_id, hora, tipo) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(atividade_id)
    .bind(punch.hora)
    .bind(punch.tipo.as_str())
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

pub async fn is_resident(pool: &SqlitePool, user_id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM perfil_residente WHERE usuario_id = ?)")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

/// Stores the workday for `residente` with its nested activities and
/// punches. A second workday for the same date is a conflict.
pub async fn create_workday(pool: &SqlitePool, residente: i64, payload: &NewWorkday) -> ApiResult<i64> {
    payload.validate()?;

    if !is_resident(pool, residente).await? {
        return Err(ApiError::validation(
            "residente",
            format!("Invalid pk \"{residente}\" - object does not exist."),
        ));
    }

    let mut tx = pool.begin().await?;

    let jornada_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO jornadas (residente_id, data, justificativa_geral)
        VALUES (?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(residente)
    .bind(payload.data)
    .bind(payload.justificativa_geral.as_deref())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::Conflict { fields, .. } => ApiError::Conflict {
            message: "A workday already exists for this resident and date".to_string(),
            fields,
        },
        other => other,
    })?;

    for atividade in &payload.atividades {
        insert_activity(&mut tx, jornada_id, atividade).await?;
    }

    tx.commit().await?;

    info!(jornada_id, residente, data = %payload.data, "Workday created");
    Ok(jornada_id)
}

async fn children(pool: &SqlitePool, jornada_id: i64) -> ApiResult<Vec<ActivityResponse>> {
    let atividades = sqlx::query_as::<_, ActivityRow>(
        "SELECT id, jornada_id, tipo, detalhe FROM atividades WHERE jornada_id = ? ORDER BY id",
    )
    .bind(jornada_id)
    .fetch_all(pool)
    .await?;

    let pontos = sqlx::query_as::<_, PunchRow>(
        r#"
        SELECT p.id, p.atividade_id, p.hora, p.tipo
        FROM pontos p
        JOIN atividades a ON a.id = p.atividade_id
        WHERE a.jornada_id = ?
        ORDER BY p.hora, p.id
        "#,
    )
    .bind(jornada_id)
    .fetch_all(pool)
    .await?;

    atividades
        .into_iter()
        .map(|atividade| {
            let pontos = pontos
                .iter()
                .filter(|p| p.atividade_id == atividade.id)
                .map(|p| {
                    Ok(PunchResponse {
                        id: p.id,
                        hora: p.hora,
                        tipo: parse_tag(&p.tipo, "punch type")?,
                    })
                })
                .collect::<ApiResult<Vec<_>>>()?;

            Ok(ActivityResponse {
                id: atividade.id,
                tipo: parse_tag(&atividade.tipo, "activity type")?,
                detalhe: atividade.detalhe,
                pontos,
            })
        })
        .collect()
}

async fn assemble(pool: &SqlitePool, row: WorkdayRow) -> ApiResult<WorkdayResponse> {
    let atividades = children(pool, row.id).await?;
    Ok(WorkdayResponse {
        id: row.id,
        residente: row.residente,
        data: row.data,
        status: parse_tag(&row.status, "workday status")?,
        justificativa_geral: row.justificativa_geral,
        validador: row.validador,
        data_validacao: row.data_validacao,
        observacao_validador: row.observacao_validador,
        atividades,
    })
}

pub async fn find_row(pool: &SqlitePool, id: i64) -> ApiResult<Option<WorkdayRow>> {
    let sql = format!("SELECT {WORKDAY_COLUMNS} FROM jornadas WHERE id = ?");
    Ok(sqlx::query_as::<_, WorkdayRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn load_workday(pool: &SqlitePool, id: i64) -> ApiResult<WorkdayResponse> {
    let row = find_row(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Workday"))?;
    assemble(pool, row).await
}

/// Paginated list, newest date first. `only_resident` pins the resident
/// filter regardless of the query.
pub async fn list_workdays(
    pool: &SqlitePool,
    filter: &WorkdayFilter,
    only_resident: Option<i64>,
) -> ApiResult<WorkdayListResponse> {
    let per_page = filter.per_page.unwrap_or(10).clamp(1, 100);
    let page = filter.page.unwrap_or(1).max(1);
    let offset = (i64::from(page) - 1) * i64::from(per_page);

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(residente) = only_resident.or(filter.residente) {
        where_sql.push_str(" AND residente_id = ?");
        args.push(FilterValue::I64(residente));
    }

    if let Some(preceptor) = filter.preceptor {
        where_sql.push_str(" AND residente_id IN (SELECT usuario_id FROM perfil_residente WHERE preceptor_id = ?)");
        args.push(FilterValue::I64(preceptor));
    }

    if let Some(status) = filter.status.as_deref() {
        let status = WorkdayStatus::from_str(status)
            .map_err(|_| ApiError::validation("status", format!("\"{status}\" is not a valid choice.")))?;
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Text(status.as_str().to_string()));
    }

    if let Some(data) = filter.data {
        where_sql.push_str(" AND data = ?");
        args.push(FilterValue::Date(data));
    }

    let count_sql = format!("SELECT COUNT(*) FROM jornadas{where_sql}");
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::I64(v) => count_q.bind(*v),
            FilterValue::Text(v) => count_q.bind(v.clone()),
            FilterValue::Date(v) => count_q.bind(*v),
        };
    }
    let total = count_q.fetch_one(pool).await?;

    let data_sql = format!(
        "SELECT {WORKDAY_COLUMNS} FROM jornadas{where_sql} ORDER BY data DESC, id DESC LIMIT ? OFFSET ?"
    );
    let mut data_q = sqlx::query_as::<_, WorkdayRow>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::I64(v) => data_q.bind(v),
            FilterValue::Text(v) => data_q.bind(v),
            FilterValue::Date(v) => data_q.bind(v),
        };
    }
    let rows = data_q
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let mut data = Vec::with_capacity(rows.len());
    for row in rows {
        data.push(assemble(pool, row).await?);
    }

    debug!(total, page, per_page, "Workdays listed");

    Ok(WorkdayListResponse {
        data,
        page,
        per_page,
        total,
    })
}

/// Moves a pending workday to a terminal state and records who, when and
/// why. The stored justification is only replaced when one is supplied.
pub async fn validate_workday(
    pool: &SqlitePool,
    id: i64,
    validador: i64,
    decision: &ValidateWorkday,
) -> ApiResult<WorkdayResponse> {
    if !WorkdayStatus::Pending.can_transition_to(decision.status) {
        return Err(ApiError::validation(
            "status",
            "Status must be aprovado, reprovado or justificado",
        ));
    }

    let mut errors = FieldErrors::new();
    if let Some(justificativa) = &decision.justificativa_geral {
        check_max_len(&mut errors, "justificativa_geral", justificativa, JUSTIFICATIVA_MAX);
    }
    errors.into_result()?;

    let result = sqlx::query(
        r#"
        UPDATE jornadas
        SET status = ?,
            validador_id = ?,
            data_validacao = ?,
            observacao_validador = ?,
            justificativa_geral = COALESCE(?, justificativa_geral)
        WHERE id = ?
        AND status = 'pendente'
        "#,
    )
    .bind(decision.status.as_str())
    .bind(validador)
    .bind(Utc::now())
    .bind(decision.observacao_validador.as_deref())
    .bind(decision.justificativa_geral.as_deref())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return match find_row(pool, id).await? {
            Some(_) => Err(ApiError::conflict("Workday has already been validated")),
            None => Err(ApiError::not_found("Workday")),
        };
    }

    info!(jornada_id = id, validador, status = %decision.status, "Workday validated");
    load_workday(pool, id).await
}

async fn ensure_pending(conn: &mut SqliteConnection, jornada_id: i64) -> ApiResult<()> {
    let status = sqlx::query_scalar::<_, String>("SELECT status FROM jornadas WHERE id = ?")
        .bind(jornada_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| ApiError::not_found("Workday"))?;

    if parse_tag::<WorkdayStatus>(&status, "workday status")?.is_terminal() {
        return Err(ApiError::conflict("Workday has already been validated"));
    }
    Ok(())
}

pub async fn add_activity(pool: &SqlitePool, jornada_id: i64, activity: &NewActivity) -> ApiResult<ActivityResponse> {
    let mut errors = FieldErrors::new();
    activity.validate(&mut errors, "detalhe");
    errors.into_result()?;

    let mut tx = pool.begin().await?;
    ensure_pending(&mut tx, jornada_id).await?;
    let atividade_id = insert_activity(&mut tx, jornada_id, activity).await?;
    tx.commit().await?;

    children(pool, jornada_id)
        .await?
        .into_iter()
        .find(|a| a.id == atividade_id)
        .ok_or_else(|| ApiError::not_found("Activity"))
}

/// Owning workday of an activity, if the activity exists.
pub async fn activity_workday(pool: &SqlitePool, atividade_id: i64) -> ApiResult<Option<WorkdayRow>> {
    let sql = format!(
        "SELECT {WORKDAY_COLUMNS} FROM jornadas WHERE id = (SELECT jornada_id FROM atividades WHERE id = ?)"
    );
    Ok(sqlx::query_as::<_, WorkdayRow>(&sql)
        .bind(atividade_id)
        .fetch_optional(pool)
        .await?)
}

pub async fn add_punch(pool: &SqlitePool, atividade_id: i64, punch: &NewPunch) -> ApiResult<PunchResponse> {
    let mut tx = pool.begin().await?;

    let jornada_id = sqlx::query_scalar::<_, i64>("SELECT jornada_id FROM atividades WHERE id = ?")
        .bind(atividade_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Activity"))?;

    ensure_pending(&mut tx, jornada_id).await?;
    let id = insert_punch(&mut tx, atividade_id, punch).await?;
    tx.commit().await?;

    Ok(PunchResponse {
        id,
        hora: punch.hora,
        tipo: punch.tipo,
    })
}

/// Only pending workdays can be removed.
pub async fn delete_workday(pool: &SqlitePool, id: i64) -> ApiResult<()> {
    let result = sqlx::query("DELETE FROM jornadas WHERE id = ? AND status = 'pendente'")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return match find_row(pool, id).await? {
            Some(_) => Err(ApiError::conflict("Validated workdays cannot be deleted")),
            None => Err(ApiError::not_found("Workday")),
        };
    }

    info!(jornada_id = id, "Workday deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::test_support::{TestContext, seed_resident, seed_user};
    use rstest::rstest;

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn workday(data: &str) -> NewWorkday {
        NewWorkday {
            residente: None,
            data: day(data),
            justificativa_geral: None,
            atividades: vec![NewActivity {
                tipo: ActivityType::Normal,
                detalhe: Some("Enfermaria".into()),
                pontos: vec![
                    NewPunch {
                        hora: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
                        tipo: PunchType::ClockOut,
                    },
                    NewPunch {
                        hora: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
                        tipo: PunchType::ClockIn,
                    },
                ],
            }],
        }
    }

    fn decision(status: WorkdayStatus) -> ValidateWorkday {
        ValidateWorkday {
            status,
            observacao_validador: Some("ok".into()),
            justificativa_geral: None,
        }
    }

    #[actix_web::test]
    async fn nested_activities_and_punches_are_stored_in_time_order() {
        let ctx = TestContext::new().await;
        let residente = seed_resident(&ctx, "400", "R400", None).await;

        let id = create_workday(&ctx.pool, residente, &workday("2024-03-01")).await.unwrap();
        let loaded = load_workday(&ctx.pool, id).await.unwrap();

        assert_eq!(loaded.status, WorkdayStatus::Pending);
        assert_eq!(loaded.atividades.len(), 1);
        let tipos: Vec<_> = loaded.atividades[0].pontos.iter().map(|p| p.tipo).collect();
        assert_eq!(tipos, vec![PunchType::ClockIn, PunchType::ClockOut]);
    }

    #[actix_web::test]
    async fn one_workday_per_resident_and_date() {
        let ctx = TestContext::new().await;
        let residente = seed_resident(&ctx, "401", "R401", None).await;

        create_workday(&ctx.pool, residente, &workday("2024-03-01")).await.unwrap();
        let err = create_workday(&ctx.pool, residente, &workday("2024-03-01")).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict { .. }));
        // the failed attempt left no partial children behind
        assert_eq!(ctx.count("atividades").await, 1);

        create_workday(&ctx.pool, residente, &workday("2024-03-02")).await.unwrap();
        assert_eq!(ctx.count("jornadas").await, 2);
    }

    #[actix_web::test]
    async fn non_resident_cannot_own_a_workday() {
        let ctx = TestContext::new().await;
        let preceptor = seed_user(&ctx, Role::Preceptor, "402").await;

        let err = create_workday(&ctx.pool, preceptor, &workday("2024-03-01")).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[actix_web::test]
    async fn validation_records_validator_and_keeps_justification() {
        let ctx = TestContext::new().await;
        let residente = seed_resident(&ctx, "403", "R403", None).await;
        let preceptor = seed_user(&ctx, Role::Preceptor, "404").await;
        let mut payload = workday("2024-03-01");
        payload.justificativa_geral = Some("Plantão extra".into());
        let id = create_workday(&ctx.pool, residente, &payload).await.unwrap();

        let validated = validate_workday(&ctx.pool, id, preceptor, &decision(WorkdayStatus::Approved))
            .await
            .unwrap();

        assert_eq!(validated.status, WorkdayStatus::Approved);
        assert_eq!(validated.validador, Some(preceptor));
        assert!(validated.data_validacao.is_some());
        assert_eq!(validated.observacao_validador.as_deref(), Some("ok"));
        assert_eq!(validated.justificativa_geral.as_deref(), Some("Plantão extra"));
    }

    #[rstest]
    #[case(WorkdayStatus::Approved)]
    #[case(WorkdayStatus::Rejected)]
    #[case(WorkdayStatus::Justified)]
    #[actix_web::test]
    async fn terminal_workdays_stay_terminal(#[case] first: WorkdayStatus) {
        let ctx = TestContext::new().await;
        let residente = seed_resident(&ctx, "405", "R405", None).await;
        let preceptor = seed_user(&ctx, Role::Preceptor, "406").await;
        let id = create_workday(&ctx.pool, residente, &workday("2024-03-01")).await.unwrap();

        validate_workday(&ctx.pool, id, preceptor, &decision(first)).await.unwrap();
        let err = validate_workday(&ctx.pool, id, preceptor, &decision(WorkdayStatus::Approved))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict { .. }));

        let activity = NewActivity {
            tipo: ActivityType::Lecture,
            detalhe: None,
            pontos: vec![],
        };
        assert!(matches!(
            add_activity(&ctx.pool, id, &activity).await.unwrap_err(),
            ApiError::Conflict { .. }
        ));
        assert!(matches!(delete_workday(&ctx.pool, id).await.unwrap_err(), ApiError::Conflict { .. }));
    }

    #[actix_web::test]
    async fn pending_is_not_a_decision() {
        let ctx = TestContext::new().await;
        let residente = seed_resident(&ctx, "407", "R407", None).await;
        let preceptor = seed_user(&ctx, Role::Preceptor, "408").await;
        let id = create_workday(&ctx.pool, residente, &workday("2024-03-01")).await.unwrap();

        let err = validate_workday(&ctx.pool, id, preceptor, &decision(WorkdayStatus::Pending))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[actix_web::test]
    async fn punches_attach_while_pending() {
        let ctx = TestContext::new().await;
        let residente = seed_resident(&ctx, "409", "R409", None).await;
        let id = create_workday(&ctx.pool, residente, &workday("2024-03-01")).await.unwrap();
        let atividade = load_workday(&ctx.pool, id).await.unwrap().atividades[0].id;

        let punch = NewPunch {
            hora: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            tipo: PunchType::BreakStart,
        };
        let stored = add_punch(&ctx.pool, atividade, &punch).await.unwrap();
        assert_eq!(stored.tipo, PunchType::BreakStart);
        assert_eq!(ctx.count("pontos").await, 3);

        assert!(matches!(
            add_punch(&ctx.pool, 999, &punch).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    #[actix_web::test]
    async fn list_filters_by_status_and_pages() {
        let ctx = TestContext::new().await;
        let residente = seed_resident(&ctx, "410", "R410", None).await;
        let preceptor = seed_user(&ctx, Role::Preceptor, "411").await;
        for d in ["2024-03-01", "2024-03-02", "2024-03-03"] {
            create_workday(&ctx.pool, residente, &workday(d)).await.unwrap();
        }
        let first = list_workdays(&ctx.pool, &WorkdayFilter::default(), None).await.unwrap();
        assert_eq!(first.total, 3);
        assert_eq!(first.data[0].data, day("2024-03-03"));

        validate_workday(&ctx.pool, first.data[0].id, preceptor, &decision(WorkdayStatus::Rejected))
            .await
            .unwrap();

        let filter = WorkdayFilter {
            status: Some("pendente".into()),
            per_page: Some(1),
            page: Some(2),
            ..Default::default()
        };
        let page = list_workdays(&ctx.pool, &filter, None).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].data, day("2024-03-01"));

        let bad = WorkdayFilter {
            status: Some("cancelado".into()),
            ..Default::default()
        };
        assert!(matches!(
            list_workdays(&ctx.pool, &bad, None).await.unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[actix_web::test]
    async fn far_page_is_empty_not_an_overflow() {
        let ctx = TestContext::new().await;
        let residente = seed_resident(&ctx, "412", "R412", None).await;
        create_workday(&ctx.pool, residente, &workday("2024-03-01")).await.unwrap();

        let filter = WorkdayFilter {
            page: Some(u32::MAX),
            per_page: Some(100),
            ..Default::default()
        };
        let page = list_workdays(&ctx.pool, &filter, None).await.unwrap();
        assert_eq!(page.total, 1);
        assert!(page.data.is_empty());
        assert_eq!(page.page, u32::MAX);
    }

    #[actix_web::test]
    async fn list_filters_by_supervising_preceptor() {
        let ctx = TestContext::new().await;
        let preceptor = seed_user(&ctx, Role::Preceptor, "413").await;
        let supervised = seed_resident(&ctx, "414", "R414", None).await;
        let other = seed_resident(&ctx, "415", "R415", None).await;
        sqlx::query("UPDATE perfil_residente SET preceptor_id = ? WHERE usuario_id = ?")
            .bind(preceptor)
            .bind(supervised)
            .execute(&ctx.pool)
            .await
            .unwrap();
        create_workday(&ctx.pool, supervised, &workday("2024-03-01")).await.unwrap();
        create_workday(&ctx.pool, other, &workday("2024-03-01")).await.unwrap();

        let filter = WorkdayFilter {
            preceptor: Some(preceptor),
            ..Default::default()
        };
        let listed = list_workdays(&ctx.pool, &filter, None).await.unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.data[0].residente, supervised);

        // pinned resident outside the preceptor's group sees nothing
        let pinned = list_workdays(&ctx.pool, &filter, Some(other)).await.unwrap();
        assert_eq!(pinned.total, 0);
    }

    #[actix_web::test]
    async fn workday_without_activities_is_rejected() {
        let ctx = TestContext::new().await;
        let residente = seed_resident(&ctx, "416", "R416", None).await;
        let mut payload = workday("2024-03-01");
        payload.atividades.clear();

        match create_workday(&ctx.pool, residente, &payload).await.unwrap_err() {
            ApiError::Validation(errors) => assert!(errors.contains("atividades")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(ctx.count("jornadas").await, 0);
    }
}
