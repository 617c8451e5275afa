use crate::{
    auth::password::hash_password,
    error::{ApiError, ApiResult, FieldErrors},
    model::{
        profile::{ESPECIALIDADE_MAX, MATRICULA_MAX, Profile, TITULO_MAX},
        role::Role,
    },
    utils::{
        cpf_registry::CpfRegistry,
        db_utils::SqlUpdate,
        validation::{check_email, check_max_len, check_required, check_text, nullable},
    },
};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error, info};
use utoipa::ToSchema;

pub const USERNAME_MAX: usize = 150;
pub const NAME_MAX: usize = 150;
pub const CPF_MAX: usize = 14;
pub const TELEFONE_MAX: usize = 20;

/// Shared user fields of every onboarding payload.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewUser {
    #[schema(example = "maria.souza")]
    pub username: String,
    #[schema(example = "s3nha-forte")]
    pub password: String,
    #[serde(default)]
    #[schema(example = "Maria")]
    pub first_name: String,
    #[serde(default)]
    #[schema(example = "Souza")]
    pub last_name: String,
    #[serde(default)]
    #[schema(example = "maria@hospital.org")]
    pub email: String,
    #[schema(example = "123.456.789-00")]
    pub cpf: String,
    #[schema(example = "+55 81 99999-0000")]
    pub telefone: Option<String>,
}

impl NewUser {
    pub fn validate(&self, errors: &mut FieldErrors) {
        check_text(errors, "username", &self.username, USERNAME_MAX);
        check_required(errors, "password", &self.password);
        check_max_len(errors, "first_name", &self.first_name, NAME_MAX);
        check_max_len(errors, "last_name", &self.last_name, NAME_MAX);
        check_email(errors, "email", &self.email);
        check_text(errors, "cpf", &self.cpf, CPF_MAX);
        if let Some(telefone) = &self.telefone {
            check_max_len(errors, "telefone", telefone, TELEFONE_MAX);
        }
    }
}

/// Partial update of the shared user fields. Omitted fields keep their
/// stored value.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct UserPatch {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub cpf: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, nullable = true)]
    pub telefone: Option<Option<String>>,
}

impl UserPatch {
    pub fn validate(&self, errors: &mut FieldErrors) {
        if let Some(username) = &self.username {
            check_text(errors, "username", username, USERNAME_MAX);
        }
        if let Some(password) = &self.password {
            check_required(errors, "password", password);
        }
        if let Some(first_name) = &self.first_name {
            check_max_len(errors, "first_name", first_name, NAME_MAX);
        }
        if let Some(last_name) = &self.last_name {
            check_max_len(errors, "last_name", last_name, NAME_MAX);
        }
        if let Some(email) = &self.email {
            check_email(errors, "email", email);
        }
        if let Some(cpf) = &self.cpf {
            check_text(errors, "cpf", cpf, CPF_MAX);
        }
        if let Some(Some(telefone)) = &self.telefone {
            check_max_len(errors, "telefone", telefone, TELEFONE_MAX);
        }
    }
}

/// Partial update of role-specific fields. Only the fields that belong to
/// the stored role are applied; the rest are rejected.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct ProfilePatch {
    pub especialidade: Option<String>,
    pub titulo: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i64>, nullable = true)]
    pub programa: Option<Option<i64>>,
    pub matricula: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i64>, nullable = true)]
    pub turma: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i64>, nullable = true)]
    pub preceptor: Option<Option<i64>>,
}

impl ProfilePatch {
    fn validate(&self, role: Role, errors: &mut FieldErrors) {
        let allowed: &[&str] = match role {
            Role::Preceptor | Role::Tutor => &["especialidade"],
            Role::GeneralCoordinator => &["titulo"],
            Role::ProgramCoordinator => &["programa"],
            Role::Resident => &["matricula", "turma", "preceptor"],
            Role::Secretary => &[],
        };
        let supplied = [
            ("especialidade", self.especialidade.is_some()),
            ("titulo", self.titulo.is_some()),
            ("programa", self.programa.is_some()),
            ("matricula", self.matricula.is_some()),
            ("turma", self.turma.is_some()),
            ("preceptor", self.preceptor.is_some()),
        ];
        for (field, present) in supplied {
            if present && !allowed.contains(&field) {
                errors.add(field, format!("Not a field of role {role}."));
            }
        }

        if let Some(especialidade) = &self.especialidade {
            check_text(errors, "especialidade", especialidade, ESPECIALIDADE_MAX);
        }
        if let Some(titulo) = &self.titulo {
            check_text(errors, "titulo", titulo, TITULO_MAX);
        }
        if let Some(matricula) = &self.matricula {
            check_text(errors, "matricula", matricula, MATRICULA_MAX);
        }
    }
}

/// User and profile fields of one update request, side by side in the body.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct PersonPatch {
    #[serde(flatten)]
    pub user: UserPatch,
    #[serde(flatten)]
    pub profile: ProfilePatch,
}

fn hash(password: &str) -> ApiResult<String> {
    hash_password(password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ApiError::Internal
    })
}

async fn exists(conn: &mut SqliteConnection, sql: &str, id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(sql).bind(id).fetch_one(&mut *conn).await
}

pub async fn program_exists(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
    exists(conn, "SELECT EXISTS(SELECT 1 FROM programas WHERE id = ?)", id).await
}

pub async fn turma_exists(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
    exists(conn, "SELECT EXISTS(SELECT 1 FROM turmas WHERE id = ?)", id).await
}

pub async fn preceptor_exists(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
    exists(conn, "SELECT EXISTS(SELECT 1 FROM perfil_preceptor WHERE usuario_id = ?)", id).await
}

/// Fails with a validation error naming every dangling reference.
async fn check_links(
    conn: &mut SqliteConnection,
    programa: Option<i64>,
    turma: Option<i64>,
    preceptor: Option<i64>,
) -> ApiResult<()> {
    let mut errors = FieldErrors::new();
    if let Some(id) = programa {
        if !program_exists(conn, id).await? {
            errors.add("programa", format!("Invalid pk \"{id}\" - object does not exist."));
        }
    }
    if let Some(id) = turma {
        if !turma_exists(conn, id).await? {
            errors.add("turma", format!("Invalid pk \"{id}\" - object does not exist."));
        }
    }
    if let Some(id) = preceptor {
        if !preceptor_exists(conn, id).await? {
            errors.add("preceptor", format!("Invalid pk \"{id}\" - object does not exist."));
        }
    }
    errors.into_result()
}

/// A program has at most one coordinator profile.
async fn ensure_program_free(
    conn: &mut SqliteConnection,
    programa: i64,
    except_user: Option<i64>,
) -> ApiResult<()> {
    let holder = sqlx::query_scalar::<_, i64>(
        "SELECT usuario_id FROM perfil_coordenador_programa WHERE programa_id = ?",
    )
    .bind(programa)
    .fetch_optional(&mut *conn)
    .await?;

    match holder {
        Some(holder) if Some(holder) != except_user => Err(ApiError::conflict_on(
            "programa",
            "This program already has a coordinator",
        )),
        _ => Ok(()),
    }
}

async fn insert_profile(conn: &mut SqliteConnection, user_id: i64, profile: &Profile) -> ApiResult<()> {
    match profile {
        Profile::Secretary => {
            sqlx::query("INSERT INTO perfil_secretario (usuario_id) VALUES (?)")
                .bind(user_id)
                .execute(&mut *conn)
                .await?;
        }
        Profile::Preceptor { especialidade } => {
            sqlx::query("INSERT INTO perfil_preceptor (usuario_id, especialidade) VALUES (?, ?)")
                .bind(user_id)
                .bind(especialidade.trim())
                .execute(&mut *conn)
                .await?;
        }
        Profile::Tutor { especialidade } => {
            sqlx::query("INSERT INTO perfil_tutor (usuario_id, especialidade) VALUES (?, ?)")
                .bind(user_id)
                .bind(especialidade.trim())
                .execute(&mut *conn)
                .await?;
        }
        Profile::GeneralCoordinator { titulo } => {
            sqlx::query("INSERT INTO perfil_coordenador_geral (usuario_id, titulo) VALUES (?, ?)")
                .bind(user_id)
                .bind(titulo.trim())
                .execute(&mut *conn)
                .await?;
        }
        Profile::ProgramCoordinator { programa } => {
            check_links(conn, *programa, None, None).await?;
            if let Some(programa) = programa {
                ensure_program_free(conn, *programa, None).await?;
            }
            sqlx::query("INSERT INTO perfil_coordenador_programa (usuario_id, programa_id) VALUES (?, ?)")
                .bind(user_id)
                .bind(*programa)
                .execute(&mut *conn)
                .await?;
        }
        Profile::Resident(fields) => {
            check_links(conn, None, fields.turma, fields.preceptor).await?;
            sqlx::query(
                "INSERT INTO perfil_residente (usuario_id, matricula, turma_id, preceptor_id) VALUES (?, ?, ?, ?)",
            )
            .bind(user_id)
            .bind(fields.matricula.trim())
            .bind(fields.turma)
            .bind(fields.preceptor)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

/// Creates the user and, when given, its profile in one transaction.
///
/// Nothing is stored unless both rows are. `profile` must agree with
/// `role`.
pub async fn onboard(
    pool: &SqlitePool,
    registry: &CpfRegistry,
    user: &NewUser,
    role: Role,
    profile: Option<&Profile>,
) -> ApiResult<i64> {
    if let Some(profile) = profile {
        if profile.role() != role {
            return Err(ApiError::validation("role", "Profile does not match role"));
        }
    }

    let cpf = user.cpf.trim();
    if !registry.is_available(pool, cpf).await? {
        info!("Onboarding rejected: CPF already registered");
        return Err(ApiError::conflict_on("cpf", "A user with this CPF already exists"));
    }

    let password_hash = hash(&user.password)?;

    let mut tx = pool.begin().await?;

    let user_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO usuarios (username, password, first_name, last_name, email, cpf, telefone, role)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(user.username.trim())
    .bind(&password_hash)
    .bind(user.first_name.trim())
    .bind(user.last_name.trim())
    .bind(user.email.trim())
    .bind(cpf)
    .bind(user.telefone.as_deref())
    .bind(role.as_str())
    .fetch_one(&mut *tx)
    .await?;

    if let Some(profile) = profile {
        insert_profile(&mut tx, user_id, profile).await?;
    }

    tx.commit().await?;

    registry.mark_taken(cpf).await;
    info!(user_id, role = %role, "User onboarded");

    Ok(user_id)
}

/// Attaches a resident profile to an existing resident-tagged user.
pub async fn attach_resident_profile(
    pool: &SqlitePool,
    user_id: i64,
    profile: &Profile,
) -> ApiResult<()> {
    let role = stored_role(pool, user_id).await?;
    if role != Role::Resident || profile.role() != Role::Resident {
        return Err(ApiError::validation(
            "usuario",
            "User must have the residente role",
        ));
    }

    let mut tx = pool.begin().await?;
    insert_profile(&mut tx, user_id, profile).await?;
    tx.commit().await?;

    debug!(user_id, "Resident profile attached");
    Ok(())
}

async fn stored_role(pool: &SqlitePool, user_id: i64) -> ApiResult<Role> {
    let tag = sqlx::query_scalar::<_, String>("SELECT role FROM usuarios WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::validation("usuario", format!("Invalid pk \"{user_id}\" - object does not exist.")))?;

    tag.parse::<Role>().map_err(|_| {
        error!(user_id, role = %tag, "Stored role is not a known tag");
        ApiError::Internal
    })
}

/// Loads `(cpf, role)` for a user whose role is one of `roles`; anything
/// else is reported as not found.
async fn load_person(pool: &SqlitePool, user_id: i64, roles: &[Role], what: &str) -> ApiResult<(String, Role)> {
    let row = sqlx::query_as::<_, (String, String)>("SELECT cpf, role FROM usuarios WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    let Some((cpf, tag)) = row else {
        return Err(ApiError::not_found(what));
    };

    match tag.parse::<Role>() {
        Ok(role) if roles.contains(&role) => Ok((cpf, role)),
        _ => Err(ApiError::not_found(what)),
    }
}

/// Patches shared user fields and the role's profile fields together.
///
/// `roles` restricts which users the calling collection may touch.
pub async fn update_person(
    pool: &SqlitePool,
    registry: &CpfRegistry,
    user_id: i64,
    roles: &[Role],
    what: &str,
    user: &UserPatch,
    profile: &ProfilePatch,
) -> ApiResult<()> {
    let (old_cpf, role) = load_person(pool, user_id, roles, what).await?;

    let mut errors = FieldErrors::new();
    user.validate(&mut errors);
    profile.validate(role, &mut errors);
    errors.into_result()?;

    let new_cpf = user
        .cpf
        .as_deref()
        .map(str::trim)
        .filter(|cpf| *cpf != old_cpf);
    if let Some(cpf) = new_cpf {
        if !registry.is_available(pool, cpf).await? {
            return Err(ApiError::conflict_on("cpf", "A user with this CPF already exists"));
        }
    }

    let password_hash = user.password.as_deref().map(hash).transpose()?;

    let mut tx = pool.begin().await?;

    let mut update = SqlUpdate::new("usuarios");
    update
        .set_some("username", user.username.as_deref().map(str::trim))
        .set_some("password", password_hash)
        .set_some("first_name", user.first_name.as_deref().map(str::trim))
        .set_some("last_name", user.last_name.as_deref().map(str::trim))
        .set_some("email", user.email.as_deref().map(str::trim))
        .set_some("cpf", new_cpf)
        .set_some("telefone", user.telefone.clone());
    update.execute(&mut *tx, "id", user_id).await?;

    update_profile(&mut tx, user_id, role, profile).await?;

    tx.commit().await?;

    if let Some(cpf) = new_cpf {
        registry.release(&old_cpf).await;
        registry.mark_taken(cpf).await;
    }

    debug!(user_id, role = %role, "Person updated");
    Ok(())
}

async fn update_profile(
    conn: &mut SqliteConnection,
    user_id: i64,
    role: Role,
    patch: &ProfilePatch,
) -> ApiResult<()> {
    let mut update = match role {
        Role::Preceptor => SqlUpdate::new("perfil_preceptor"),
        Role::Tutor => SqlUpdate::new("perfil_tutor"),
        Role::GeneralCoordinator => SqlUpdate::new("perfil_coordenador_geral"),
        Role::ProgramCoordinator => SqlUpdate::new("perfil_coordenador_programa"),
        Role::Resident => SqlUpdate::new("perfil_residente"),
        Role::Secretary => return Ok(()),
    };

    match role {
        Role::Preceptor | Role::Tutor => {
            update.set_some("especialidade", patch.especialidade.as_deref().map(str::trim));
        }
        Role::GeneralCoordinator => {
            update.set_some("titulo", patch.titulo.as_deref().map(str::trim));
        }
        Role::ProgramCoordinator => {
            if let Some(Some(programa)) = patch.programa {
                check_links(conn, Some(programa), None, None).await?;
                ensure_program_free(conn, programa, Some(user_id)).await?;
            }
            update.set_some("programa_id", patch.programa);
        }
        Role::Resident => {
            check_links(conn, None, patch.turma.flatten(), patch.preceptor.flatten()).await?;
            update
                .set_some("matricula", patch.matricula.as_deref().map(str::trim))
                .set_some("turma_id", patch.turma)
                .set_some("preceptor_id", patch.preceptor);
        }
        Role::Secretary => {}
    }

    if !update.is_empty() && update.execute(&mut *conn, "usuario_id", user_id).await? == 0 {
        return Err(ApiError::not_found("Profile"));
    }
    Ok(())
}

/// Deletes the user behind a profile; profile rows go with it.
pub async fn delete_person(
    pool: &SqlitePool,
    registry: &CpfRegistry,
    user_id: i64,
    roles: &[Role],
    what: &str,
) -> ApiResult<()> {
    let (cpf, role) = load_person(pool, user_id, roles, what).await?;

    sqlx::query("DELETE FROM usuarios WHERE id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    registry.release(&cpf).await;
    info!(user_id, role = %role, "Person deleted");
    Ok(())
}
