use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod model;
mod models;
mod routes;
mod service;
mod state;
mod store;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::service::analysis::{LlmTrendAnalyzer, TrendAnalyzer};
use crate::state::AppState;
use crate::store::mysql::{MySqlLedger, MySqlRoster};
use crate::utils::nisn_index::NisnIndex;
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "School attendance service"
}

fn build_analyzer(config: &Config) -> anyhow::Result<Option<Arc<dyn TrendAnalyzer>>> {
    let Some(url) = config.analysis_api_url.clone() else {
        info!("ANALYSIS_API_URL not set, trend analysis disabled");
        return Ok(None);
    };

    let analyzer = LlmTrendAnalyzer::new(
        url,
        config.analysis_api_key.clone(),
        config.analysis_model.clone(),
        Duration::from_secs(config.analysis_timeout_secs),
    )
    .context("Failed to build the analysis client")?;

    Ok(Some(Arc::new(analyzer)))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await?;
    auth::handlers::ensure_bootstrap_admin(&pool, &config).await?;

    let state = AppState {
        roster: Arc::new(MySqlRoster::new(pool.clone())),
        ledger: Arc::new(MySqlLedger::new(pool.clone())),
        nisn_index: Arc::new(NisnIndex::new()),
        analyzer: build_analyzer(&config)?,
    };

    let warmup_state = state.clone();
    actix_web::rt::spawn(async move {
        match warmup_state
            .nisn_index
            .warmup(warmup_state.roster.as_ref())
            .await
        {
            Ok(count) => info!(count, "NISN index warmed up"),
            Err(e) => error!(error = %e, "Failed to warm up NISN index"),
        }
    });

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(state.clone()))
            .service(index)
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
