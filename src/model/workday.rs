use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};
use utoipa::ToSchema;

/// Approval state of a whole workday.
///
/// `pendente` is the only non-terminal state; every other state is
/// reached from it exactly once.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, IntoStaticStr, ToSchema,
)]
pub enum WorkdayStatus {
    #[serde(rename = "pendente")]
    #[strum(serialize = "pendente")]
    Pending,
    #[serde(rename = "aprovado")]
    #[strum(serialize = "aprovado")]
    Approved,
    #[serde(rename = "reprovado")]
    #[strum(serialize = "reprovado")]
    Rejected,
    #[serde(rename = "justificado")]
    #[strum(serialize = "justificado")]
    Justified,
}

impl WorkdayStatus {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    pub fn is_terminal(self) -> bool {
        self != WorkdayStatus::Pending
    }

    pub fn can_transition_to(self, next: WorkdayStatus) -> bool {
        self == WorkdayStatus::Pending && next.is_terminal()
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, IntoStaticStr, ToSchema,
)]
pub enum ActivityType {
    #[serde(rename = "normal")]
    #[strum(serialize = "normal")]
    Normal,
    #[serde(rename = "aula_teorica")]
    #[strum(serialize = "aula_teorica")]
    Lecture,
    #[serde(rename = "atestado")]
    #[strum(serialize = "atestado")]
    MedicalCertificate,
    #[serde(rename = "evento_autorizado")]
    #[strum(serialize = "evento_autorizado")]
    AuthorizedEvent,
}

impl ActivityType {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, IntoStaticStr, ToSchema,
)]
pub enum PunchType {
    #[serde(rename = "entrada")]
    #[strum(serialize = "entrada")]
    ClockIn,
    #[serde(rename = "saida")]
    #[strum(serialize = "saida")]
    ClockOut,
    #[serde(rename = "inicio_intervalo")]
    #[strum(serialize = "inicio_intervalo")]
    BreakStart,
    #[serde(rename = "fim_intervalo")]
    #[strum(serialize = "fim_intervalo")]
    BreakEnd,
}

impl PunchType {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WorkdayRow {
    pub id: i64,
    pub residente: i64,
    pub data: NaiveDate,
    pub status: String,
    pub justificativa_geral: Option<String>,
    pub validador: Option<i64>,
    pub data_validacao: Option<DateTime<Utc>>,
    pub observacao_validador: Option<String>,
}

pub const WORKDAY_COLUMNS: &str = "id, residente_id AS residente, data, status, justificativa_geral, \
     validador_id AS validador, data_validacao, observacao_validador";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityRow {
    pub id: i64,
    pub jornada_id: i64,
    pub tipo: String,
    pub detalhe: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PunchRow {
    pub id: i64,
    pub atividade_id: i64,
    pub hora: NaiveTime,
    pub tipo: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PunchResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "07:00:00", value_type = String, format = "time")]
    pub hora: NaiveTime,
    pub tipo: PunchType,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActivityResponse {
    #[schema(example = 1)]
    pub id: i64,
    pub tipo: ActivityType,
    #[schema(nullable = true)]
    pub detalhe: Option<String>,
    pub pontos: Vec<PunchResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WorkdayResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = 7)]
    pub residente: i64,
    #[schema(example = "2024-03-01", format = "date", value_type = String)]
    pub data: NaiveDate,
    pub status: WorkdayStatus,
    #[schema(nullable = true)]
    pub justificativa_geral: Option<String>,
    #[schema(nullable = true)]
    pub validador: Option<i64>,
    #[schema(nullable = true, format = "date-time", value_type = Option<String>)]
    pub data_validacao: Option<DateTime<Utc>>,
    #[schema(nullable = true)]
    pub observacao_validador: Option<String>,
    pub atividades: Vec<ActivityResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case(WorkdayStatus::Approved)]
    #[case(WorkdayStatus::Rejected)]
    #[case(WorkdayStatus::Justified)]
    fn pending_moves_to_any_terminal_state(#[case] next: WorkdayStatus) {
        assert!(WorkdayStatus::Pending.can_transition_to(next));
        assert!(!next.can_transition_to(WorkdayStatus::Pending));
        assert!(!next.can_transition_to(WorkdayStatus::Approved));
    }

    #[test]
    fn pending_to_pending_is_not_a_transition() {
        assert!(!WorkdayStatus::Pending.can_transition_to(WorkdayStatus::Pending));
    }

    #[test]
    fn stored_tags_round_trip_through_strum() {
        assert_eq!(WorkdayStatus::Rejected.as_str(), "reprovado");
        assert_eq!(ActivityType::from_str("aula_teorica").unwrap(), ActivityType::Lecture);
        assert_eq!(PunchType::BreakStart.as_str(), "inicio_intervalo");
        assert!(WorkdayStatus::from_str("cancelado").is_err());
    }
}
