#![deny(missing_docs)]
//! Sentry server executable.
//!
//! Accepts building-model uploads, runs the simulated analysis, and serves
//! project health data to the dashboard UI.

mod analysis;
mod config;
mod db;
mod models;
mod openapi;
mod routes;
mod schema;
mod store;

#[cfg(not(test))]
use std::sync::Arc;

#[cfg(not(test))]
use actix_cors::Cors;
#[cfg(not(test))]
use actix_web::{App, HttpServer, http::header, web};
#[cfg(not(test))]
use dotenvy::dotenv;
#[cfg(not(test))]
use sentry_core::LocalFileStore;

#[cfg(not(test))]
use crate::analysis::AnalysisService;
#[cfg(not(test))]
use crate::config::ServerConfig;
#[cfg(not(test))]
use crate::db::init_pool;
#[cfg(not(test))]
use crate::routes::{AppState, configure, multipart_config};
#[cfg(not(test))]
use crate::store::PgProjectStore;

#[cfg(not(test))]
fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env().map_err(std::io::Error::other)?;
    let pool = init_pool(&config.database_url).map_err(std::io::Error::other)?;
    let files = LocalFileStore::new(&config.upload_dir).map_err(std::io::Error::other)?;
    log::info!("storing uploads under {}", files.root().display());
    if let Some(seed) = config.random_seed {
        log::info!("simulation seed fixed to {seed}");
    }

    let state = web::Data::new(AppState {
        projects: Arc::new(PgProjectStore::new(pool)),
        files: Arc::new(files),
        analysis: AnalysisService::default(),
        random_seed: config.random_seed,
    });
    let allowed_origins = config.ui_origins.clone();
    let max_upload_bytes = config.max_upload_bytes;

    log::info!("listening on {}:{}", config.host, config.port);
    actix_web::rt::System::new().block_on(async move {
        HttpServer::new(move || {
            let mut cors = Cors::default()
                .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
                .max_age(3600);
            for origin in &allowed_origins {
                cors = cors.allowed_origin(origin);
            }
            App::new()
                .wrap(actix_web::middleware::Logger::default())
                .wrap(cors)
                .app_data(state.clone())
                .app_data(multipart_config(max_upload_bytes))
                .configure(configure)
        })
        .bind((config.host.as_str(), config.port))?
        .run()
        .await
    })
}

#[cfg(test)]
fn main() {}
