/// S3 operations for media upload and removal
use crate::config::S3Config;
use crate::{Result, S3Error};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct S3Operations {
    client: Arc<Client>,
    config: S3Config,
}

impl S3Operations {
    pub fn new(client: Arc<Client>, config: S3Config) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &S3Config {
        &self.config
    }

    /// Upload an object and return its public URL.
    ///
    /// Uploads never overwrite: an existing key makes the request fail with
    /// `412 Precondition Failed`, which surfaces as `S3Error::Request`.
    pub async fn upload_file(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String> {
        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type(content_type)
            .cache_control(&self.config.cache_control)
            .if_none_match("*")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| S3Error::Request(format!("put_object {key}: {}", DisplayErrorContext(&e))))?;

        Ok(self.config.public_url(key))
    }

    /// Delete an object. Deleting a missing key succeeds.
    pub async fn delete_file(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                S3Error::Request(format!("delete_object {key}: {}", DisplayErrorContext(&e)))
            })?;

        Ok(())
    }
}
