use crate::{auth::auth::AuthUser, error::ErrorBody, model::role::Role};
use actix_web::{HttpResponse, Responder};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

/// One shortcut tile of the landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Module {
    #[schema(example = "Bater Ponto")]
    pub titulo: String,
    #[schema(example = "bater-ponto.html")]
    pub link: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardResponse {
    pub modulos: Vec<Module>,
}

fn modules(entries: &[(&str, &str)]) -> Vec<Module> {
    entries
        .iter()
        .map(|(titulo, link)| Module {
            titulo: titulo.to_string(),
            link: link.to_string(),
        })
        .collect()
}

static DASHBOARD: Lazy<HashMap<Role, Vec<Module>>> = Lazy::new(|| {
    HashMap::from([
        (
            Role::Secretary,
            modules(&[
                ("Programas", "secret-programas.html"),
                ("Turmas", "secret-turmas.html"),
                ("Residentes", "secret-residentes.html"),
                ("Preceptores", "secret-preceptores.html"),
                ("Coordenadores", "secret-coordenadores.html"),
            ]),
        ),
        (
            Role::Resident,
            modules(&[
                ("Bater Ponto", "bater-ponto.html"),
                ("Ponto Retroativo", "ponto-retroativo.html"),
                ("Histórico", "detalhe-historico.html"),
                ("Notificações", "notificacoes-residente.html"),
            ]),
        ),
        (
            Role::Preceptor,
            modules(&[
                ("Pendências", "precept-pendencias.html"),
                ("Turmas", "precept-turmas.html"),
                ("Residentes", "precept-residentes.html"),
                ("Atividades", "precept-atividades.html"),
                ("Avaliações", "precept-avaliacoes.html"),
            ]),
        ),
        (
            Role::ProgramCoordinator,
            modules(&[
                ("Programa", "visualizar_programa.html"),
                ("Turmas", "secret-turmas.html"),
                ("Residentes", "secret-residentes.html"),
            ]),
        ),
    ])
});

/// Shortcuts for `role`; empty for roles without a landing page.
pub fn modules_for(role: Role) -> &'static [Module] {
    DASHBOARD.get(&role).map(Vec::as_slice).unwrap_or_default()
}

/// Landing page shortcuts for the caller's role
#[utoipa::path(
    get,
    path = "/api/dashboard-modules",
    responses(
        (status = 200, description = "Shortcuts of the caller's role", body = DashboardResponse),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn dashboard_modules(auth: AuthUser) -> impl Responder {
    HttpResponse::Ok().json(DashboardResponse {
        modulos: modules_for(auth.role).to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestContext, call, get, init_app, seed_user};
    use actix_web::http::StatusCode;
    use rstest::rstest;

    #[rstest]
    #[case(Role::Tutor)]
    #[case(Role::GeneralCoordinator)]
    fn unmapped_roles_get_nothing(#[case] role: Role) {
        assert!(modules_for(role).is_empty());
    }

    #[test]
    fn order_is_kept() {
        let titles: Vec<_> = modules_for(Role::Resident).iter().map(|m| m.titulo.as_str()).collect();
        assert_eq!(titles, ["Bater Ponto", "Ponto Retroativo", "Histórico", "Notificações"]);
    }

    #[actix_web::test]
    async fn requires_authentication() {
        let ctx = TestContext::new().await;
        let app = init_app(&ctx).await;

        let (status, body) = call(&app, get("/api/dashboard-modules/", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "unauthorized");

        let (status, _) = call(&app, get("/api/dashboard-modules/", Some("not-a-token"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn resident_gets_resident_modules() {
        let ctx = TestContext::new().await;
        let resident = seed_user(&ctx, Role::Resident, "1300").await;
        let token = ctx.token(resident, Role::Resident);
        let app = init_app(&ctx).await;

        let (status, body) = call(&app, get("/api/dashboard-modules/", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["modulos"][0]["titulo"], "Bater Ponto");
        assert_eq!(body["modulos"][0]["link"], "bater-ponto.html");
        assert_eq!(body["modulos"].as_array().map(Vec::len), Some(4));
        assert_ne!(body["modulos"][0]["titulo"], "Programas");
    }

    #[actix_web::test]
    async fn general_coordinator_gets_empty_list() {
        let ctx = TestContext::new().await;
        let user = seed_user(&ctx, Role::GeneralCoordinator, "1310").await;
        let token = ctx.token(user, Role::GeneralCoordinator);
        let app = init_app(&ctx).await;

        let (status, body) = call(&app, get("/api/dashboard-modules", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["modulos"], serde_json::json!([]));
    }
}
