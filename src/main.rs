use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpResponse, HttpServer, Responder, get};
use serde_json::json;

mod api;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod routes;
mod scheduler;
mod service;
mod state;
mod store;
mod utils;

#[cfg(test)]
mod tests;

use config::Config;
use db::LazyPool;
use state::AppState;
use store::mysql::{MySqlAttendanceStore, MySqlRoster};

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index(db: Data<Arc<LazyPool>>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "service": "attendance",
        "database_ready": db.is_ready()
    }))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log, mirrored to stdout
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking.and(std::io::stdout))
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(
        guard = ?config.checkin_guard,
        shift_start = %config.shift.start,
        shift_end = %config.shift.end,
        timezone = %config.shift.timezone,
        "Server starting..."
    );

    // Connects on first use
    let db = Arc::new(LazyPool::new(
        &config.database_url,
        config.db_max_connections,
        config.store_timeout,
    ));
    let store = Arc::new(MySqlAttendanceStore::new(db.clone(), config.store_timeout));
    let roster = Arc::new(MySqlRoster::new(db.clone(), config.store_timeout));
    let state = Data::new(AppState::new(&config, store, roster));

    if config.shift.reconcile_enabled {
        actix_web::rt::spawn(scheduler::run_daily(state.reconciler.clone()));
    } else {
        warn!("Daily absentee check disabled");
    }

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();
    let db_data = db.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(Data::new(db_data.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config_data))
    })
    .bind(server_addr)?
    .run()
    .await?;

    db.close().await;
    info!("Server stopped");
    Ok(())
}
