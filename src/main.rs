use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod services;
mod utils;

#[cfg(test)]
mod test_support;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::utils::cpf_registry::CpfRegistry;
use std::io;
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("{e:#}")))?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await.map_err(|e| {
        error!(error = %e, "Database initialisation failed");
        io::Error::other(e)
    })?;

    let registry = CpfRegistry::new();

    let (filter_registry, filter_pool) = (registry.clone(), pool.clone());
    actix_web::rt::spawn(async move {
        if let Err(e) = filter_registry.warmup_filter(&filter_pool, 100).await {
            error!(error = %e, "Failed to warm up CPF filter");
        }
    });

    let (cache_registry, cache_pool) = (registry.clone(), pool.clone());
    actix_web::rt::spawn(async move {
        // users who logged in during the last 30 days
        if let Err(e) = cache_registry.warmup_cache(&cache_pool, 30, 250).await {
            error!(error = %e, "Failed to warm up CPF cache");
        }
    });

    let server_addr = config.server_addr.clone();
    info!(addr = %server_addr, prefix = %config.api_prefix, "Listening");

    HttpServer::new(move || {
        let config = config.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard so JS/CSS assets resolve
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(registry.clone()))
            .configure(move |cfg| routes::configure(cfg, config))
    })
    .bind(server_addr)?
    .run()
    .await
}
