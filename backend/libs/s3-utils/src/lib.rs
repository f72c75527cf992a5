/// Shared S3 utilities for Minigram services
///
/// Provides the object-storage configuration, an S3-compatible client used
/// as the media store, and helpers that map between object keys and the
/// public URLs stored in the database.
use aws_sdk_s3::Client;
use std::sync::Arc;

pub mod config;
pub mod operations;

pub use config::S3Config;
pub use operations::S3Operations;

/// Errors raised by the S3 helpers
#[derive(Debug, thiserror::Error)]
pub enum S3Error {
    #[error("S3 configuration error: {0}")]
    Config(String),

    #[error("S3 request failed: {0}")]
    Request(String),
}

pub type Result<T> = std::result::Result<T, S3Error>;

/// Shared S3 client wrapper
#[derive(Clone)]
pub struct S3Client {
    client: Arc<Client>,
    config: S3Config,
}

impl S3Client {
    /// Create new S3 client with configuration from environment
    pub async fn from_env() -> Result<Self> {
        let config = S3Config::from_env()?;
        Ok(Self::with_config(config).await)
    }

    /// Create new S3 client with custom configuration.
    ///
    /// Credentials come from the default AWS provider chain. When an endpoint
    /// override is configured the client talks to that S3-compatible service
    /// instead of AWS.
    pub async fn with_config(config: S3Config) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        tracing::info!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = config.endpoint.as_deref().unwrap_or("aws"),
            "S3 client initialized"
        );

        Self {
            client: Arc::new(Client::from_conf(builder.build())),
            config,
        }
    }

    /// Get reference to underlying AWS S3 client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Get S3 configuration
    pub fn config(&self) -> &S3Config {
        &self.config
    }

    /// Object operations bound to the configured bucket
    pub fn operations(&self) -> S3Operations {
        S3Operations::new(self.client.clone(), self.config.clone())
    }

    /// Health check for S3 connectivity
    pub async fn health_check(&self) -> Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(|e| {
                S3Error::Request(format!(
                    "head_bucket {}: {}",
                    self.config.bucket,
                    aws_sdk_s3::error::DisplayErrorContext(&e)
                ))
            })?;

        Ok(())
    }
}
