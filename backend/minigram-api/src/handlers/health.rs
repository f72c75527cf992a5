/// Health check handlers
///
/// `/health` reports database reachability, `/health/ready` checks every
/// dependency with latency, `/health/live` always answers.
use crate::storage::MediaStore;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Dependencies probed by the health endpoints
pub struct HealthState {
    /// `None` when running on in-memory stores
    db_pool: Option<PgPool>,
    media: Arc<dyn MediaStore>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct ComponentCheck {
    pub status: ComponentStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub status: ComponentStatus,
    pub checks: HashMap<String, ComponentCheck>,
    pub timestamp: String,
}

impl HealthState {
    pub fn new(db_pool: Option<PgPool>, media: Arc<dyn MediaStore>) -> Self {
        Self { db_pool, media }
    }

    async fn check_postgres(&self) -> Result<(), String> {
        match &self.db_pool {
            Some(pool) => sqlx::query("SELECT 1")
                .fetch_one(pool)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string()),
            None => Ok(()),
        }
    }

    async fn check_storage(&self) -> Result<(), String> {
        self.media.health_check().await.map_err(|e| e.to_string())
    }
}

fn component(result: Result<(), String>, ok: &str, failed: &str, started: Instant) -> ComponentCheck {
    let latency_ms = Some(started.elapsed().as_millis() as u64);
    match result {
        Ok(()) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: ok.to_string(),
            latency_ms,
        },
        Err(e) => ComponentCheck {
            status: ComponentStatus::Unhealthy,
            message: format!("{}: {}", failed, e),
            latency_ms,
        },
    }
}

/// GET /api/health
pub async fn health_summary(state: web::Data<HealthState>) -> HttpResponse {
    match state.check_postgres().await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "minigram-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unhealthy",
                "error": "PostgreSQL connection failed",
                "service": "minigram-api"
            }))
        }
    }
}

/// GET /api/health/ready
pub async fn readiness_summary(state: web::Data<HealthState>) -> HttpResponse {
    let mut checks = HashMap::new();

    let started = Instant::now();
    let postgres = component(
        state.check_postgres().await,
        "PostgreSQL connection successful",
        "PostgreSQL connection failed",
        started,
    );
    checks.insert("postgresql".to_string(), postgres);

    let started = Instant::now();
    let storage = component(
        state.check_storage().await,
        "Object storage reachable",
        "Object storage check failed",
        started,
    );
    checks.insert("storage".to_string(), storage);

    let ready = checks
        .values()
        .all(|check| check.status == ComponentStatus::Healthy);
    let response = ReadinessResponse {
        ready,
        status: if ready {
            ComponentStatus::Healthy
        } else {
            ComponentStatus::Unhealthy
        },
        checks,
        timestamp: Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

/// GET /api/health/live
pub async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}
