use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use db_pool::{create_pool, DbConfig};
use scrapp_service::db::{PgPostRepository, PgUserRepository};
use scrapp_service::middleware::AllowedHosts;
use scrapp_service::services::{GeminiClient, OnnxTrashModel};
use scrapp_service::{handlers, ApiSettings, AppState, Config};
use std::io;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,scrapp_service=debug".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn build_cors(allowed_origins: &str) -> Cors {
    let mut cors = Cors::default();
    for origin in allowed_origins.split(',') {
        let origin = origin.trim();
        if origin == "*" {
            cors = cors.allow_any_origin();
        } else if !origin.is_empty() {
            cors = cors.allowed_origin(origin);
        }
    }
    cors.allow_any_method().allow_any_header().max_age(3600)
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    tracing::error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenvy::dotenv();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(!config.app.debug);

    tracing::info!("Starting scrapp-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    if config.uses_insecure_secret() {
        tracing::warn!("SECRET_KEY is not set; using the development fallback");
    }

    // Model artifacts are mandatory: refuse to serve without them.
    let model_path = config.classifier.model_path.clone();
    let labels_path = config.classifier.labels_path.clone();
    let model = web::block(move || OnnxTrashModel::load(&model_path, &labels_path))
        .await
        .map_err(|e| startup_error("Model loader panicked", e))?
        .map_err(|e| startup_error("Failed to load trash classifier", e))?;

    let chat_client =
        GeminiClient::new(&config.chat).map_err(|e| startup_error("Failed to build chat client", e))?;

    let db_config = DbConfig::from_env("scrapp-service")
        .map_err(|e| startup_error("Database configuration invalid", e))?;
    db_config.log_config();
    let db_pool = create_pool(db_config)
        .await
        .map_err(|e| startup_error("Failed to create database pool", e))?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| startup_error("Failed to run migrations", e))?;
    tracing::info!("Database migrations applied");

    let state = web::Data::new(AppState::new(
        Arc::new(model),
        Arc::new(chat_client),
        Arc::new(PgPostRepository::new(db_pool.clone())),
        Arc::new(PgUserRepository::new(db_pool.clone())),
        ApiSettings::from(&config),
    ));

    let bind_addr = config.bind_addr();
    let allowed_hosts = config.app.allowed_hosts.clone();
    let allowed_origins = config.cors.allowed_origins.clone();

    tracing::info!("Starting HTTP server at {}", bind_addr);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(AllowedHosts::new(allowed_hosts.clone()))
            .wrap(build_cors(&allowed_origins))
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure)
    })
    .bind(&bind_addr)?
    .shutdown_timeout(30)
    .disable_signals()
    .run();

    let handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping HTTP server");
    handle.stop(true).await;

    match server_task.await {
        Ok(result) => result?,
        Err(e) => tracing::error!("HTTP server task failed: {}", e),
    }

    db_pool.close().await;
    tracing::info!("scrapp-service stopped");
    Ok(())
}
