/// S3 configuration shared across services
use crate::{Result, S3Error};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,
    /// AWS region
    pub region: String,
    /// Endpoint override for S3-compatible storage (MinIO, Supabase, R2)
    pub endpoint: Option<String>,
    /// Base URL under which objects are publicly readable
    pub public_base_url: String,
    /// Whether to use path-style URLs (false = virtual-hosted-style)
    pub force_path_style: bool,
    /// Cache-Control header stored with every uploaded object
    pub cache_control: String,
}

impl S3Config {
    /// Load S3 configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let bucket = std::env::var("S3_BUCKET").unwrap_or_else(|_| "uploads".to_string());
        let region = std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        if bucket.trim().is_empty() {
            return Err(S3Error::Config("S3_BUCKET must not be empty".to_string()));
        }

        let force_path_style = match std::env::var("S3_FORCE_PATH_STYLE") {
            Ok(raw) => raw.parse::<bool>().map_err(|e| {
                S3Error::Config(format!("Failed to parse S3_FORCE_PATH_STYLE='{}': {}", raw, e))
            })?,
            Err(_) => false,
        };

        let public_base_url = std::env::var("S3_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("https://{}.s3.{}.amazonaws.com", bucket, region));

        Ok(Self {
            bucket,
            region,
            endpoint: std::env::var("S3_ENDPOINT").ok().filter(|s| !s.trim().is_empty()),
            public_base_url,
            force_path_style,
            cache_control: std::env::var("S3_CACHE_CONTROL")
                .unwrap_or_else(|_| "max-age=3600".to_string()),
        })
    }

    /// Public URL for an object key
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            key.trim_start_matches('/')
        )
    }

    /// Recover the object key from a public URL.
    ///
    /// URLs under `public_base_url` map directly. Otherwise the path segments
    /// following the bucket name are used, which covers path-style URLs and
    /// storage gateways that embed the bucket in the path. Returns `None`
    /// when neither form matches.
    pub fn key_from_public_url(&self, url: &str) -> Option<String> {
        let url = url.split(['?', '#']).next().unwrap_or_default();
        let base = format!("{}/", self.public_base_url.trim_end_matches('/'));

        if let Some(key) = url.strip_prefix(&base) {
            return (!key.is_empty()).then(|| key.to_string());
        }

        let path = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
        let segments: Vec<&str> = path.split('/').skip(1).filter(|s| !s.is_empty()).collect();
        let bucket_pos = segments.iter().position(|s| *s == self.bucket)?;
        let key = segments[bucket_pos + 1..].join("/");

        (!key.is_empty()).then_some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base: &str) -> S3Config {
        S3Config {
            bucket: "uploads".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            public_base_url: base.to_string(),
            force_path_style: false,
            cache_control: "max-age=3600".to_string(),
        }
    }

    #[test]
    fn test_public_url_joins_without_double_slash() {
        let cfg = config("https://cdn.example.com/");
        assert_eq!(
            cfg.public_url("/posts/abc/1.jpg"),
            "https://cdn.example.com/posts/abc/1.jpg"
        );
    }

    #[test]
    fn test_key_from_url_under_base() {
        let cfg = config("https://cdn.example.com");
        let url = cfg.public_url("posts/abc/1700000000000-x1y2z.png");
        assert_eq!(
            cfg.key_from_public_url(&url).as_deref(),
            Some("posts/abc/1700000000000-x1y2z.png")
        );
    }

    #[test]
    fn test_key_from_url_strips_query() {
        let cfg = config("https://cdn.example.com");
        assert_eq!(
            cfg.key_from_public_url("https://cdn.example.com/posts/a/b.jpg?v=2")
                .as_deref(),
            Some("posts/a/b.jpg")
        );
    }

    #[test]
    fn test_key_from_url_with_bucket_segment() {
        let cfg = config("https://cdn.example.com");
        let url = "https://xyz.supabase.co/storage/v1/object/public/uploads/posts/a/b.jpg";
        assert_eq!(cfg.key_from_public_url(url).as_deref(), Some("posts/a/b.jpg"));
    }

    #[test]
    fn test_key_from_unrelated_url_is_none() {
        let cfg = config("https://cdn.example.com");
        assert_eq!(cfg.key_from_public_url("https://elsewhere.com/img/b.jpg"), None);
        assert_eq!(cfg.key_from_public_url("https://cdn.example.com/"), None);
    }
}
