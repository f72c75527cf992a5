//! Prometheus metrics for minigram-api.
//!
//! Exposes action counters, upload sizes and an HTTP handler for the
//! `/metrics` endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec, Encoder, Histogram,
    HistogramVec, IntCounterVec, TextEncoder,
};

lazy_static! {
    /// Mutating operations segmented by action and outcome.
    pub static ref ACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "minigram_actions_total",
        "Mutating API operations segmented by action and outcome",
        &["action", "outcome"]
    )
    .expect("failed to register minigram_actions_total");

    /// Size of accepted image uploads.
    pub static ref UPLOAD_BYTES: Histogram = register_histogram!(
        "minigram_upload_bytes",
        "Size in bytes of accepted image uploads",
        vec![16_384.0, 65_536.0, 262_144.0, 1_048_576.0, 2_097_152.0, 5_242_880.0]
    )
    .expect("failed to register minigram_upload_bytes");

    /// Feed assembly latency segmented by scope (global, author).
    pub static ref FEED_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "minigram_feed_request_duration_seconds",
        "Feed assembly duration segmented by scope",
        &["scope"]
    )
    .expect("failed to register minigram_feed_request_duration_seconds");
}

/// Count one mutating operation. Outcome is `success` or the error class.
pub fn record_action<T>(action: &str, result: &crate::error::Result<T>) {
    use crate::error::AppError;

    let outcome = match result {
        Ok(_) => "success",
        Err(AppError::Unauthorized(_)) => "unauthorized",
        Err(AppError::Forbidden(_)) => "forbidden",
        Err(AppError::NotFound(_)) => "not_found",
        Err(AppError::ValidationError(_)) | Err(AppError::BadRequest(_)) => "invalid",
        Err(AppError::Conflict(_)) => "conflict",
        Err(_) => "error",
    };
    ACTIONS_TOTAL.with_label_values(&[action, outcome]).inc();
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_record_action_labels_outcome() {
        let before = ACTIONS_TOTAL.with_label_values(&["test_like", "conflict"]).get();
        record_action::<()>("test_like", &Err(AppError::Conflict("dup".into())));
        let after = ACTIONS_TOTAL.with_label_values(&["test_like", "conflict"]).get();

        assert_eq!(after, before + 1);
    }
}
