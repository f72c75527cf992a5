/// Minigram API Library
///
/// The feed and interaction API of the Minigram photo-sharing app: posts with
/// images, likes, comments, follows, profiles and search, served as JSON
/// over HTTP.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route table
/// - `models`: Rows, response views and service inputs
/// - `services`: Business logic layer
/// - `db`: Store traits, Postgres repositories and in-memory stores
/// - `storage`: Media store for uploaded images
/// - `middleware`: Identity gateway (session token extractors)
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;

use actix_web::web;
use handlers::health::HealthState;
use middleware::IdentityGateway;

/// Register shared data, extractor settings and every route
pub fn configure_api(
    cfg: &mut web::ServiceConfig,
    state: web::Data<AppState>,
    gateway: web::Data<IdentityGateway>,
    health: web::Data<HealthState>,
) {
    cfg.app_data(state)
        .app_data(gateway)
        .app_data(health)
        .configure(handlers::extractor_config)
        .configure(handlers::configure)
        .route("/metrics", web::get().to(metrics::serve_metrics));
}
