//! Payload storage on a WebDAV file service.
//!
//! Clients never talk to the file service directly. Uploads go through the
//! API and reads go through the image proxy, so the credentials stay here.

use std::future::Future;
use std::time::Instant;

use opentelemetry::KeyValue;
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use crate::config::WebDavConfig;
use crate::error::{Error, Result};
use crate::telemetry::metrics;

/// Directory every upload lands in.
pub const UPLOAD_DIR: &str = "/uploads/";

/// Put and get opaque blobs by path.
pub trait FileStore: Send + Sync + 'static {
    fn put(&self, path: &str, bytes: Vec<u8>) -> impl Future<Output = Result<()>> + Send;

    fn get(&self, path: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// WebDAV client using HTTP basic auth.
#[derive(Clone)]
pub struct WebDav {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: SecretString,
}

impl std::fmt::Debug for WebDav {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDav")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl WebDav {
    pub fn new(config: &WebDavConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    /// Resolve `path` against the base URL. The resolved path must still lie
    /// inside the upload directory, whatever the URL parser normalised.
    fn url(&self, path: &str) -> Result<reqwest::Url> {
        let parse = |raw: &str| {
            reqwest::Url::parse(raw)
                .map_err(|e| Error::FileStore(format!("bad file service url {raw:?}: {e}")))
        };
        let uploads = parse(&format!("{}{UPLOAD_DIR}", self.base_url))?;
        let url = parse(&format!("{}/{}", self.base_url, path.trim_start_matches('/')))?;
        if !url.path().starts_with(uploads.path()) || url.path() == uploads.path() {
            return Err(Error::Validation(format!(
                "path {path:?} resolves outside {UPLOAD_DIR}"
            )));
        }
        Ok(url)
    }

    async fn fetch(&self, url: reqwest::Url) -> reqwest::Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let bytes = response.error_for_status()?.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }

    fn record(operation: &'static str, started: Instant, ok: bool) {
        let result = if ok { "ok" } else { "error" };
        metrics::file_store_operations().add(
            1,
            &[
                KeyValue::new("operation", operation),
                KeyValue::new("result", result),
            ],
        );
        metrics::operation_duration_ms().record(
            started.elapsed().as_secs_f64() * 1000.0,
            &[KeyValue::new("operation", format!("filestore.{operation}"))],
        );
    }
}

impl FileStore for WebDav {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        let url = self.url(path)?;
        let started = Instant::now();
        let size = bytes.len();
        let result = self
            .client
            .put(url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .body(bytes)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map(|_| ())
            .map_err(|e| Error::FileStore(format!("upload of {path} failed: {e}")));

        Self::record("put", started, result.is_ok());
        if result.is_ok() {
            tracing::debug!(path, size, "file stored");
        }
        result
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.url(path)?;
        let started = Instant::now();
        let result = self.fetch(url).await;

        Self::record("get", started, result.is_ok());
        match result {
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) => Err(Error::NotFound(format!("file {path}"))),
            Err(e) => Err(Error::FileStore(format!("download of {path} failed: {e}"))),
        }
    }
}

/// Storage path for a new upload: unique prefix plus a sanitised file name.
pub fn upload_path(file_name: &str) -> String {
    let clean: String = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let clean = clean.trim_start_matches('.');
    let clean = if clean.is_empty() { "image" } else { clean };
    format!("{UPLOAD_DIR}{}-{clean}", Uuid::new_v4().simple())
}

/// Accept only paths inside the upload directory.
pub fn validate_path(path: &str) -> Result<()> {
    let Some(rest) = path.strip_prefix(UPLOAD_DIR) else {
        return Err(Error::Validation(format!("path must start with {UPLOAD_DIR}")));
    };
    // Percent escapes could decode to `..` further down the line.
    if path
        .chars()
        .any(|c| c.is_control() || matches!(c, '%' | '?' | '#'))
    {
        return Err(Error::Validation(format!("invalid characters in path {path:?}")));
    }
    if rest.is_empty() || rest.split(['/', '\\']).any(|seg| seg == ".." || seg.is_empty()) {
        return Err(Error::Validation(format!("invalid path {path:?}")));
    }
    Ok(())
}

/// Content type guessed from the file extension.
///
/// Only passive raster formats get an image type. Anything that can carry
/// script, SVG included, is served as an opaque download.
pub fn content_type_for(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}
