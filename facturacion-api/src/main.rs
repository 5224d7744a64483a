use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use facturacion_api::config::ApiConfig;
use facturacion_api::helpers::auth::{bootstrap_admin, AuthService};
use facturacion_api::integrations::{PergamoClient, ReportSource};
use facturacion_api::jobs::billing_sync::BillingSyncManager;
use facturacion_api::jobs::cancellation_sync::CancellationSyncManager;
use facturacion_api::jobs::SyncSettings;
use facturacion_api::{helpers, routes};
use std::sync::Arc;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long)]
    log_file_path: Option<String>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if let Some(log_path) = args.log_file_path {
        let log_path = std::path::Path::new(&log_path);
        let file_appender = tracing_appender::rolling::never(
            log_path.parent().unwrap_or(std::path::Path::new(".")),
            log_path
                .file_name()
                .unwrap_or(std::ffi::OsStr::new("facturacion-api.log")),
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        std::mem::forget(guard);

        tracing_subscriber::registry()
            .with(env_filter.clone())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(true)
                    .with_writer(std::io::stdout),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let (config, config_path) = ApiConfig::load().context("Failed to load config")?;
    tracing::info!("Configuration loaded from {}", config_path.display());

    let db = helpers::database::initialize_database(&config)
        .context("Failed to initialize database")?;

    let auth_service = Arc::new(AuthService::from_config(&config.auth));
    bootstrap_admin(db.async_connection.clone(), &auth_service, &config.auth)
        .await
        .context("Failed to create the initial administrator")?;

    if config.pergamo.base_url.is_empty() {
        tracing::warn!("pergamo.base_url is not set; synchronization requests will fail");
    }
    let pergamo_client = Arc::new(
        PergamoClient::new(config.pergamo.clone()).context("Failed to build Pergamo client")?,
    );
    let report_source: Arc<dyn ReportSource> = pergamo_client.clone();
    let settings = SyncSettings::from_config(&config)?;

    let billing_manager = Arc::new(BillingSyncManager::new(
        db.async_connection.clone(),
        report_source.clone(),
        settings.clone(),
    ));
    let cancellation_manager = Arc::new(CancellationSyncManager::new(
        db.async_connection.clone(),
        report_source,
        settings,
    ));

    let (host, port) = config.bind_address();
    tracing::info!("Server will listen on {}:{}", host, port);

    let cors_config = config.cors.clone();
    let server = HttpServer::new(move || {
        let cors = if let Some(cors_config) = &cors_config {
            let mut cors_builder = Cors::default();
            for origin in &cors_config.allowed_origins {
                cors_builder = cors_builder.allowed_origin(origin);
            }
            cors_builder
                .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
                .allowed_headers(vec!["Authorization", "Accept", "Content-Type"])
                .expose_headers(vec!["Content-Disposition"])
                .max_age(3600)
        } else {
            Cors::default()
                .allow_any_origin()
                .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
                .allowed_headers(vec!["Authorization", "Accept", "Content-Type"])
                .expose_headers(vec!["Content-Disposition"])
                .max_age(3600)
        };

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(pergamo_client.clone()))
            .app_data(web::Data::new(billing_manager.clone()))
            .app_data(web::Data::new(cancellation_manager.clone()))
            .configure(routes::configure)
    })
    .bind((host.as_str(), port))?
    .run();

    server.await?;
    Ok(())
}
