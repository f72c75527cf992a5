//! Media Store
//!
//! Binary uploads for post images and avatars. The S3 implementation goes
//! through `s3-utils`; the in-memory one backs tests and local runs without
//! object storage.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use s3_utils::{S3Client, S3Config};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

const RANDOM_SUFFIX_LEN: usize = 10;
const DEFAULT_EXTENSION: &str = "jpg";

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store `bytes` under `key` and return the public URL
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Recover the object key from a URL previously returned by `upload`
    fn key_from_url(&self, url: &str) -> Option<String>;

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// S3-compatible media store
pub struct S3MediaStore {
    client: S3Client,
}

impl S3MediaStore {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let url = self
            .client
            .operations()
            .upload_file(key, bytes, content_type)
            .await?;
        Ok(url)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client.operations().delete_file(key).await?;
        Ok(())
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        self.client.config().key_from_public_url(url)
    }

    async fn health_check(&self) -> Result<()> {
        self.client.health_check().await?;
        Ok(())
    }
}

#[derive(Default)]
struct MemoryObjects {
    objects: HashMap<String, (Vec<u8>, String)>,
    fail_uploads: bool,
    fail_deletes: bool,
}

/// Media store held in process memory
pub struct InMemoryMediaStore {
    config: S3Config,
    inner: Mutex<MemoryObjects>,
}

impl InMemoryMediaStore {
    pub fn new(public_base_url: &str) -> Self {
        Self {
            config: S3Config {
                bucket: "uploads".to_string(),
                region: "local".to_string(),
                endpoint: None,
                public_base_url: public_base_url.to_string(),
                force_path_style: true,
                cache_control: "max-age=3600".to_string(),
            },
            inner: Mutex::new(MemoryObjects::default()),
        }
    }

    fn inner(&self) -> std::sync::MutexGuard<'_, MemoryObjects> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.inner().fail_uploads = fail;
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.inner().fail_deletes = fail;
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner().objects.contains_key(key)
    }

    pub fn object_count(&self) -> usize {
        self.inner().objects.len()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner().objects.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for InMemoryMediaStore {
    fn default() -> Self {
        Self::new("http://localhost/uploads")
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let mut inner = self.inner();
        if inner.fail_uploads {
            return Err(AppError::Storage(format!("upload of {key} rejected")));
        }
        if inner.objects.contains_key(key) {
            return Err(AppError::Storage(format!("object {key} already exists")));
        }
        inner
            .objects
            .insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(self.config.public_url(key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut inner = self.inner();
        if inner.fail_deletes {
            return Err(AppError::Storage(format!("delete of {key} rejected")));
        }
        inner.objects.remove(key);
        Ok(())
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        self.config.key_from_public_url(url)
    }
}

/// Object key for a post image: `posts/{author_id}/{millis}-{random}.{ext}`
pub fn post_image_key(author_id: Uuid, file_name: Option<&str>, content_type: &str) -> String {
    format!(
        "posts/{}/{}",
        author_id,
        unique_file_name("", file_name, content_type)
    )
}

/// Object key for an avatar: `{external_id}/profile-{millis}-{random}.{ext}`.
/// External ids with no usable characters fall back to the internal user id.
pub fn avatar_key(
    user_id: Uuid,
    external_id: &str,
    file_name: Option<&str>,
    content_type: &str,
) -> String {
    let mut owner: String = external_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect();
    if owner.is_empty() {
        owner = user_id.to_string();
    }
    format!(
        "{}/{}",
        owner,
        unique_file_name("profile-", file_name, content_type)
    )
}

fn unique_file_name(prefix: &str, file_name: Option<&str>, content_type: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();

    format!(
        "{}{}-{}.{}",
        prefix,
        Utc::now().timestamp_millis(),
        suffix,
        file_extension(file_name, content_type)
    )
}

/// Extension of the uploaded file name, else the MIME subtype, else `jpg`
pub(crate) fn file_extension(file_name: Option<&str>, content_type: &str) -> String {
    let from_name = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| is_safe_extension(ext));
    if let Some(ext) = from_name {
        return ext;
    }

    content_type
        .parse::<mime::Mime>()
        .ok()
        .filter(|m| m.type_() == mime::IMAGE)
        .map(|m| m.subtype().as_str().to_ascii_lowercase())
        .filter(|ext| is_safe_extension(ext))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

fn is_safe_extension(ext: &str) -> bool {
    (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric())
}
