//! Test harness for HTTP-level tests
//!
//! Builds the full route table over in-memory stores and mints HS256 session
//! tokens, so no PostgreSQL or object storage is needed.

#![allow(dead_code)]

use actix_web::body::to_bytes;
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::web;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use minigram_api::config::LimitsConfig;
use minigram_api::db::{InMemoryStore, Stores};
use minigram_api::handlers::health::HealthState;
use minigram_api::middleware::{Claims, IdentityGateway};
use minigram_api::storage::InMemoryMediaStore;
use minigram_api::AppState;
use std::sync::Arc;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const BOUNDARY: &str = "----minigram-test-boundary";

pub struct TestContext {
    pub store: Arc<InMemoryStore>,
    pub media: Arc<InMemoryMediaStore>,
    state: web::Data<AppState>,
    gateway: web::Data<IdentityGateway>,
    health: web::Data<HealthState>,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let media = Arc::new(InMemoryMediaStore::new("http://cdn.test/uploads"));
        let state = AppState::new(
            Stores::in_memory(store.clone()),
            media.clone(),
            LimitsConfig::default(),
            "user_",
        );

        Self {
            store,
            media: media.clone(),
            state: web::Data::new(state),
            gateway: web::Data::new(IdentityGateway::hs256(TEST_SECRET)),
            health: web::Data::new(HealthState::new(None, media)),
        }
    }

    /// Route configuration for `App::configure`
    pub fn configure(&self) -> impl FnOnce(&mut web::ServiceConfig) {
        let state = self.state.clone();
        let gateway = self.gateway.clone();
        let health = self.health.clone();
        move |cfg| minigram_api::configure_api(cfg, state, gateway, health)
    }
}

pub fn create_test_jwt(sub: &str, name: Option<&str>, expires_in_seconds: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: sub.to_string(),
        exp: (now + expires_in_seconds) as usize,
        iat: Some(now as usize),
        iss: None,
        name: name.map(str::to_string),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

/// `Authorization` header for a caller
pub fn bearer(sub: &str) -> (header::HeaderName, String) {
    (
        header::AUTHORIZATION,
        format!("Bearer {}", create_test_jwt(sub, None, 3600)),
    )
}

pub fn multipart_content_type() -> (header::HeaderName, String) {
    (
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", BOUNDARY),
    )
}

/// A multipart body with an optional image part and text fields
pub fn multipart_body(image: Option<(&str, &str, &[u8])>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();

    if let Some((file_name, content_type, bytes)) = image {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\n",
                file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn jpeg_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.resize(len.max(4), 0xAB);
    bytes
}

pub async fn json_body(resp: ServiceResponse) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
