//! Remote fetch with an on-disk cache.
//!
//! Every remote resource the build uses (Google Fonts CSS, remote images) is
//! fetched through [`FetchCache`]. Entries live in the cache directory as a
//! pair of files keyed by the SHA-256 of the URL:
//!
//! ```text
//! .cache/
//! ├── 3f1c…e2.body    # raw response body
//! └── 3f1c…e2.json    # {"url": …, "cached_at": <epoch secs>, "kind": "text"}
//! ```
//!
//! An entry younger than the request's [`CacheDuration`] is served from
//! disk. Anything else goes to the network through an [`HttpClient`]; when
//! the network fails and a stale entry exists, the stale body is used with a
//! warning. Concurrent requests for one key wait on a per-key lock, so at
//! most one request per key is in flight.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request to {url} failed: {message}")]
    Http { url: String, message: String },
    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("Cache IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid cache duration: {0:?}")]
    InvalidDuration(String),
    #[error("Response from {0} is not valid UTF-8")]
    NotText(String),
}

// =============================================================================
// HTTP seam
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str, headers: &[(String, String)])
    -> Result<HttpResponse, FetchError>;
}

/// Production client.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| FetchError::Http {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<HttpResponse, FetchError> {
        let http_err = |e: reqwest::Error| FetchError::Http {
            url: url.to_string(),
            message: e.to_string(),
        };
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send().await.map_err(http_err)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(http_err)?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

// =============================================================================
// Options
// =============================================================================

/// How long a cached entry stays fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDuration {
    For(Duration),
    /// `*`: never refetch once cached.
    Forever,
}

impl CacheDuration {
    /// Parse `"<n><unit>"` with units `s m h d w y` (a year is 365 days),
    /// or `"*"`.
    pub fn parse(s: &str) -> Result<Self, FetchError> {
        let s = s.trim();
        if s == "*" {
            return Ok(Self::Forever);
        }
        let invalid = || FetchError::InvalidDuration(s.to_string());
        let unit = s.chars().last().ok_or_else(invalid)?;
        let amount: u64 = s[..s.len() - unit.len_utf8()]
            .parse()
            .map_err(|_| invalid())?;
        let seconds = match unit {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            'w' => 7 * 24 * 60 * 60,
            'y' => 365 * 24 * 60 * 60,
            _ => return Err(invalid()),
        };
        let total = amount.checked_mul(seconds).ok_or_else(invalid)?;
        Ok(Self::For(Duration::from_secs(total)))
    }

    fn is_fresh(self, age_secs: i64) -> bool {
        match self {
            Self::Forever => true,
            Self::For(d) => age_secs >= 0 && (age_secs as u64) < d.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Text,
    Buffer,
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub duration: CacheDuration,
    pub kind: ResponseKind,
    pub headers: Vec<(String, String)>,
    /// Drop `?query` and `#fragment` from the cache key.
    pub remove_url_query_params: bool,
}

impl FetchOptions {
    pub fn new(duration: CacheDuration, kind: ResponseKind) -> Self {
        Self {
            duration,
            kind,
            headers: Vec::new(),
            remove_url_query_params: false,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn without_query_params(mut self) -> Self {
        self.remove_url_query_params = true;
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    url: String,
    cached_at: i64,
    kind: ResponseKind,
}

// =============================================================================
// Cache
// =============================================================================

pub fn is_remote(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://")
}

fn strip_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

pub struct FetchCache {
    dir: PathBuf,
    client: Arc<dyn HttpClient>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FetchCache {
    pub fn new(dir: impl Into<PathBuf>, client: Arc<dyn HttpClient>) -> Self {
        Self {
            dir: dir.into(),
            client,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache_key(url: &str, options: &FetchOptions) -> String {
        let key_url = if options.remove_url_query_params {
            strip_query(url)
        } else {
            url
        };
        crate::cache::hash_bytes(key_url.as_bytes())
    }

    fn body_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.body"))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    /// Fetch `url`, returning the path of the cached body on disk.
    pub async fn fetch_to_path(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<PathBuf, FetchError> {
        let key = Self::cache_key(url, options);
        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        let body_path = self.body_path(&key);
        let meta = self.read_meta(&key).await;
        if let Some(meta) = &meta
            && options.duration.is_fresh(Utc::now().timestamp() - meta.cached_at)
            && body_path.exists()
        {
            debug!("fetch cache hit: {url}");
            return Ok(body_path);
        }

        match self.download(url, options).await {
            Ok(body) => {
                self.write_entry(&key, url, options.kind, &body).await?;
                info!("fetched {url}");
                Ok(body_path)
            }
            Err(e) if meta.is_some() && body_path.exists() => {
                warn!("{e}; using expired cache entry for {url}");
                Ok(body_path)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn fetch_bytes(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<Vec<u8>, FetchError> {
        let path = self.fetch_to_path(url, options).await?;
        tokio::fs::read(&path)
            .await
            .map_err(|source| FetchError::Io { path, source })
    }

    pub async fn fetch_text(&self, url: &str, options: &FetchOptions) -> Result<String, FetchError> {
        let bytes = self.fetch_bytes(url, options).await?;
        String::from_utf8(bytes).map_err(|_| FetchError::NotText(url.to_string()))
    }

    async fn download(&self, url: &str, options: &FetchOptions) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url, &options.headers).await?;
        if !(200..300).contains(&response.status) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok(response.body)
    }

    async fn read_meta(&self, key: &str) -> Option<EntryMeta> {
        let raw = tokio::fs::read(self.meta_path(key)).await.ok()?;
        serde_json::from_slice(&raw).ok()
    }

    async fn write_entry(
        &self,
        key: &str,
        url: &str,
        kind: ResponseKind,
        body: &[u8],
    ) -> Result<(), FetchError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| FetchError::Io { path, source }
        };
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(io_err(&self.dir))?;

        let body_path = self.body_path(key);
        tokio::fs::write(&body_path, body)
            .await
            .map_err(io_err(&body_path))?;

        let meta = EntryMeta {
            url: url.to_string(),
            cached_at: Utc::now().timestamp(),
            kind,
        };
        let json = serde_json::to_vec_pretty(&meta).map_err(|e| FetchError::Io {
            path: self.meta_path(key),
            source: e.into(),
        })?;
        let meta_path = self.meta_path(key);
        tokio::fs::write(&meta_path, json)
            .await
            .map_err(io_err(&meta_path))
    }
}
