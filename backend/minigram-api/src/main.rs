use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use minigram_api::db::{self, Stores};
use minigram_api::handlers::health::HealthState;
use minigram_api::middleware::IdentityGateway;
use minigram_api::storage::{MediaStore, S3MediaStore};
use minigram_api::{AppState, Config};
use s3_utils::S3Client;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Minigram API
///
/// Serves the feed, post, comment, like, follow, profile and search
/// endpoints under `/api`, health checks under `/api/health` and Prometheus
/// metrics on `/metrics`.
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting minigram-api v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to connect to PostgreSQL")?;
    if config.database.run_migrations {
        db::run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;
        tracing::info!("Database migrations applied");
    }

    let s3_client = S3Client::with_config(config.storage.clone()).await;
    let media: Arc<dyn MediaStore> = Arc::new(S3MediaStore::new(s3_client));

    let gateway = IdentityGateway::from_config(&config.auth)
        .context("Failed to initialize session token verification")?;

    let state = web::Data::new(AppState::new(
        Stores::postgres(pool.clone()),
        media.clone(),
        config.limits.clone(),
        &config.auth.external_id_prefix,
    ));
    let gateway = web::Data::new(gateway);
    let health = web::Data::new(HealthState::new(Some(pool), media));

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let allowed_origins = config.cors.allowed_origins.clone();
    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);
        for origin in allowed_origins.split(',').map(str::trim) {
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }

        let state = state.clone();
        let gateway = gateway.clone();
        let health = health.clone();

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(move |cfg| minigram_api::configure_api(cfg, state, gateway, health))
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .workers(config.app.workers)
    .run()
    .await
    .context("HTTP server error")?;

    tracing::info!("minigram-api shut down");
    Ok(())
}
