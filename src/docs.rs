use crate::api::coordinator::{CoordinatorPatch, CoordinatorPayload, CoordinatorResponse};
use crate::api::dashboard::{DashboardResponse, Module};
use crate::api::preceptor::{PreceptorPayload, PreceptorResponse};
use crate::api::program::{ProgramPatch, ProgramPayload};
use crate::api::resident::{ResidentFilter, ResidentPayload};
use crate::api::sector::{SectorPatch, SectorPayload};
use crate::api::turma::{TurmaPatch, TurmaPayload};
use crate::api::user::UserPayload;
use crate::error::ErrorBody;
use crate::model::profile::ProfileFields;
use crate::model::program::ProgramResponse;
use crate::model::resident::ResidentResponse;
use crate::model::role::Role;
use crate::model::sector::Sector;
use crate::model::turma::TurmaResponse;
use crate::model::user::UserResponse;
use crate::model::workday::{
    ActivityResponse, ActivityType, PunchResponse, PunchType, WorkdayResponse, WorkdayStatus,
};
use crate::models::{LoginReqDto, RefreshReqDto, TokenPair};
use crate::services::user_service::{NewUser, PersonPatch, ProfilePatch, UserPatch};
use crate::services::workday_service::{
    NewActivity, NewPunch, NewWorkday, ValidateWorkday, WorkdayFilter, WorkdayListResponse,
};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Frequência API",
        version = "1.0.0",
        description = r#"
## Medical Residency Attendance

Administrative backend of a medical-residency program.

### Key Features
- **Organisation**
  - Sectors, programs and classes (turmas) in a strict hierarchy
- **People**
  - Onboarding of residents, preceptors and coordinators with their role profiles
- **Attendance**
  - Daily workdays with activities and punches, approved or rejected by a preceptor
- **Dashboard**
  - Landing page shortcuts per role

### Security
Obtain a token pair at `/api/token` with **CPF** and password, then send
`Authorization: Bearer <access>`. Management writes are limited to
secretaries and coordinators.

### Response Format
- JSON bodies, errors as `{message, code, details?}`
- Workday listing is paginated
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::dashboard::dashboard_modules,

        crate::api::user::list_users,
        crate::api::user::create_user,
        crate::api::user::me,

        crate::api::sector::list_sectors,
        crate::api::sector::create_sector,
        crate::api::sector::get_sector,
        crate::api::sector::update_sector,
        crate::api::sector::patch_sector,
        crate::api::sector::delete_sector,

        crate::api::program::list_programs,
        crate::api::program::create_program,
        crate::api::program::get_program,
        crate::api::program::update_program,
        crate::api::program::patch_program,
        crate::api::program::delete_program,

        crate::api::turma::list_turmas,
        crate::api::turma::create_turma,
        crate::api::turma::get_turma,
        crate::api::turma::update_turma,
        crate::api::turma::patch_turma,
        crate::api::turma::delete_turma,

        crate::api::resident::list_residents,
        crate::api::resident::create_resident,
        crate::api::resident::get_resident,
        crate::api::resident::update_resident,
        crate::api::resident::delete_resident,

        crate::api::preceptor::list_preceptors,
        crate::api::preceptor::create_preceptor,
        crate::api::preceptor::get_preceptor,
        crate::api::preceptor::update_preceptor,
        crate::api::preceptor::delete_preceptor,

        crate::api::coordinator::list_coordinators,
        crate::api::coordinator::create_coordinator,
        crate::api::coordinator::get_coordinator,
        crate::api::coordinator::update_coordinator,
        crate::api::coordinator::delete_coordinator,

        crate::api::workday::list_workdays,
        crate::api::workday::create_workday,
        crate::api::workday::get_workday,
        crate::api::workday::delete_workday,
        crate::api::workday::validate_workday,
        crate::api::workday::add_activity,
        crate::api::workday::add_punch
    ),
    components(
        schemas(
            ErrorBody,
            LoginReqDto,
            RefreshReqDto,
            TokenPair,
            Role,
            Module,
            DashboardResponse,
            NewUser,
            UserPatch,
            ProfileFields,
            ProfilePatch,
            PersonPatch,
            UserPayload,
            UserResponse,
            Sector,
            SectorPayload,
            SectorPatch,
            ProgramPayload,
            ProgramPatch,
            ProgramResponse,
            TurmaPayload,
            TurmaPatch,
            TurmaResponse,
            ResidentPayload,
            ResidentFilter,
            ResidentResponse,
            PreceptorPayload,
            PreceptorResponse,
            CoordinatorPayload,
            CoordinatorPatch,
            CoordinatorResponse,
            WorkdayStatus,
            ActivityType,
            PunchType,
            NewPunch,
            NewActivity,
            NewWorkday,
            ValidateWorkday,
            WorkdayFilter,
            PunchResponse,
            ActivityResponse,
            WorkdayResponse,
            WorkdayListResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Token issuance by CPF"),
        (name = "Dashboard", description = "Role landing page"),
        (name = "Organisation", description = "Sectors, programs and classes"),
        (name = "People", description = "Users and role profiles"),
        (name = "Attendance", description = "Workdays, activities and punches"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
