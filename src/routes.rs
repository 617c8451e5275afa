use crate::{
    api::{coordinator, dashboard, preceptor, program, resident, sector, turma, user, workday},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::ApiError,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

// Helper to build per-scope limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
    let cfg: GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware> = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| ApiError::from(err).into()))
        .app_data(web::QueryConfig::default().error_handler(|err, _| ApiError::from(err).into()));

    let prefix = config.api_prefix.trim_end_matches('/');

    // Token endpoints, public
    cfg.service(
        web::scope(&format!("{prefix}/token"))
            .wrap(build_limiter(config.rate_login_per_min))
            .service(web::resource("").route(web::post().to(handlers::login)))
            .service(web::resource("/refresh").route(web::post().to(handlers::refresh_token)))
            .service(web::resource("/logout").route(web::post().to(handlers::logout))),
    );

    // Protected routes
    cfg.service(
        web::scope(prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(build_limiter(config.rate_protected_per_min)) // rate limiting
            .service(
                web::resource("/dashboard-modules").route(web::get().to(dashboard::dashboard_modules)),
            )
            .service(
                web::scope("/usuarios")
                    .service(
                        web::resource("")
                            .route(web::get().to(user::list_users))
                            .route(web::post().to(user::create_user)),
                    )
                    .service(web::resource("/me").route(web::get().to(user::me))),
            )
            .service(
                web::scope("/setores")
                    .service(
                        web::resource("")
                            .route(web::get().to(sector::list_sectors))
                            .route(web::post().to(sector::create_sector)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(sector::get_sector))
                            .route(web::put().to(sector::update_sector))
                            .route(web::patch().to(sector::patch_sector))
                            .route(web::delete().to(sector::delete_sector)),
                    ),
            )
            .service(
                web::scope("/programas")
                    .service(
                        web::resource("")
                            .route(web::get().to(program::list_programs))
                            .route(web::post().to(program::create_program)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(program::get_program))
                            .route(web::put().to(program::update_program))
                            .route(web::patch().to(program::patch_program))
                            .route(web::delete().to(program::delete_program)),
                    ),
            )
            .service(
                web::scope("/turmas")
                    .service(
                        web::resource("")
                            .route(web::get().to(turma::list_turmas))
                            .route(web::post().to(turma::create_turma)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(turma::get_turma))
                            .route(web::put().to(turma::update_turma))
                            .route(web::patch().to(turma::patch_turma))
                            .route(web::delete().to(turma::delete_turma)),
                    ),
            )
            // people: PUT and PATCH are both partial
            .service(
                web::scope("/residentes")
                    .service(
                        web::resource("")
                            .route(web::get().to(resident::list_residents))
                            .route(web::post().to(resident::create_resident)),
                    )
                    .service(
                        web::resource("/{usuario}")
                            .route(web::get().to(resident::get_resident))
                            .route(web::put().to(resident::update_resident))
                            .route(web::patch().to(resident::update_resident))
                            .route(web::delete().to(resident::delete_resident)),
                    ),
            )
            .service(
                web::scope("/preceptores")
                    .service(
                        web::resource("")
                            .route(web::get().to(preceptor::list_preceptors))
                            .route(web::post().to(preceptor::create_preceptor)),
                    )
                    .service(
                        web::resource("/{usuario}")
                            .route(web::get().to(preceptor::get_preceptor))
                            .route(web::put().to(preceptor::update_preceptor))
                            .route(web::patch().to(preceptor::update_preceptor))
                            .route(web::delete().to(preceptor::delete_preceptor)),
                    ),
            )
            .service(
                web::scope("/coordenadores")
                    .service(
                        web::resource("")
                            .route(web::get().to(coordinator::list_coordinators))
                            .route(web::post().to(coordinator::create_coordinator)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(coordinator::get_coordinator))
                            .route(web::put().to(coordinator::update_coordinator))
                            .route(web::patch().to(coordinator::update_coordinator))
                            .route(web::delete().to(coordinator::delete_coordinator)),
                    ),
            )
            .service(
                web::scope("/jornadas")
                    // /jornadas
                    .service(
                        web::resource("")
                            .route(web::get().to(workday::list_workdays))
                            .route(web::post().to(workday::create_workday)),
                    )
                    // /jornadas/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(workday::get_workday))
                            .route(web::delete().to(workday::delete_workday)),
                    )
                    // /jornadas/{id}/validar
                    .service(
                        web::resource("/{id}/validar").route(web::post().to(workday::validate_workday)),
                    )
                    // /jornadas/{id}/atividades
                    .service(
                        web::resource("/{id}/atividades").route(web::post().to(workday::add_activity)),
                    ),
            )
            .service(
                web::resource("/atividades/{id}/pontos").route(web::post().to(workday::add_punch)),
            ),
    );
}

// LOGIN (CPF + password)
//  ├─ access (15 min)
//  └─ refresh (7 days, single use)

// API REQUEST
//  └─ Authorization: Bearer access

// ACCESS EXPIRED
//  └─ POST /token/refresh with refresh
//       └─ returns a new pair, old refresh revoked
