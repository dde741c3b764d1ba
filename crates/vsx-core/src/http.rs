//! Open VSX registry client over HTTP.
//!
//! Provides access to a registry instance via:
//! - Extension metadata API (`{base}/api/{namespace}/{name}`)
//! - Per-version documents referenced from `allVersions`
//! - Namespace creation (`POST {base}/api/-/namespace/create`)
//! - Publishing (`POST {base}/api/-/publish`)
//!
//! Write endpoints authenticate with a personal access token passed as the
//! `token` query parameter. The token never appears in errors or logs.

use crate::error::{MirrorError, Result};
use crate::registry::{NamespaceOutcome, PublishOutcome, Registry};
use crate::types::{
    ExtensionJson, PackageMetadata, VersionMetadata, decode_extension, error_message,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, RequestBuilder, StatusCode, header};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const USER_AGENT: &str = concat!("vsx-mirror/", env!("CARGO_PKG_VERSION"));

/// Default timeout applied to every request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

static NAMESPACE_EXISTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Namespace already exists:").unwrap());
static ALREADY_PUBLISHED: Lazy<Regex> = Lazy::new(|| Regex::new(r"is already published").unwrap());

/// Registry client backed by `reqwest`.
///
/// # Examples
///
/// ```no_run
/// use vsx_core::{HttpRegistry, Registry};
///
/// # async fn example() -> vsx_core::Result<()> {
/// let downstream = HttpRegistry::new("http://localhost:8080")?;
/// downstream.create_namespace("acme", "super_token").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpRegistry {
    base_url: String,
    client: Client,
}

impl HttpRegistry {
    /// Creates a client for `base_url` with the default request timeout.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| MirrorError::transport(base_url, e))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// The underlying client, for requests outside the registry API such
    /// as the sitemap.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// URL of the metadata document for `namespace.name`.
    ///
    /// Path components are URL-encoded to prevent path traversal.
    pub fn metadata_url(&self, namespace: &str, name: &str) -> String {
        format!(
            "{}/api/{}/{}",
            self.base_url,
            urlencoding::encode(namespace),
            urlencoding::encode(name)
        )
    }

    async fn fetch_extension(&self, url: &str) -> Result<ExtensionJson> {
        tracing::debug!(url, "fetching metadata");

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| MirrorError::transport(url, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| MirrorError::transport(url, e))?;

        if !status.is_success() {
            return Err(status_error(url, status, &body));
        }

        decode_extension(&body)?.into_result(url, status.as_u16())
    }

    /// Sends a write request and returns the status and body.
    ///
    /// `label` is the token-free URL used in errors.
    async fn send_write(
        &self,
        request: RequestBuilder,
        label: &str,
    ) -> Result<(StatusCode, Bytes)> {
        let response = request
            .send()
            .await
            .map_err(|e| MirrorError::transport(label, e.without_url()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| MirrorError::transport(label, e.without_url()))?;

        Ok((status, body))
    }

    fn write_url(&self, endpoint: &str, token: &str) -> (String, String) {
        let label = format!("{}/api/-/{}", self.base_url, endpoint);
        let url = format!("{}?token={}", label, urlencoding::encode(token));
        (url, label)
    }
}

/// Maps a non-success response to an error, keeping an embedded message.
fn status_error(url: &str, status: StatusCode, body: &[u8]) -> MirrorError {
    match error_message(body) {
        Some(message) => MirrorError::Rejected {
            url: url.to_string(),
            status: status.as_u16(),
            message,
        },
        None => MirrorError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        },
    }
}

/// Classifies a write response. `Ok(true)` means the registry reported a
/// conflict matching `conflict`, which callers treat as success.
fn classify_write(label: &str, status: StatusCode, body: &[u8], conflict: &Regex) -> Result<bool> {
    match error_message(body) {
        Some(message) if conflict.is_match(&message) => Ok(true),
        Some(message) => Err(MirrorError::Rejected {
            url: label.to_string(),
            status: status.as_u16(),
            message,
        }),
        None if status.is_success() => Ok(false),
        None => Err(MirrorError::Status {
            url: label.to_string(),
            status: status.as_u16(),
        }),
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    fn url(&self) -> &str {
        &self.base_url
    }

    async fn get_metadata(&self, namespace: &str, name: &str) -> Result<PackageMetadata> {
        let url = self.metadata_url(namespace, name);
        let json = self.fetch_extension(&url).await?;
        let mut metadata = PackageMetadata::from(json);

        if metadata.namespace.is_empty() {
            metadata.namespace = namespace.to_string();
        }
        if metadata.name.is_empty() {
            metadata.name = name.to_string();
        }
        Ok(metadata)
    }

    async fn get_document(&self, url: &str) -> Result<VersionMetadata> {
        let json = self.fetch_extension(url).await?;
        Ok(VersionMetadata::from(json))
    }

    async fn create_namespace(&self, name: &str, token: &str) -> Result<NamespaceOutcome> {
        let (url, label) = self.write_url("namespace/create", token);
        let request = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "name": name }));

        let (status, body) = self.send_write(request, &label).await?;
        if classify_write(&label, status, &body, &NAMESPACE_EXISTS)? {
            Ok(NamespaceOutcome::AlreadyExists)
        } else {
            Ok(NamespaceOutcome::Created)
        }
    }

    async fn publish(&self, file_path: &Path, token: &str) -> Result<PublishOutcome> {
        let artifact = tokio::fs::read(file_path).await?;
        let (url, label) = self.write_url("publish", token);
        let request = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(artifact);

        let (status, body) = self.send_write(request, &label).await?;
        if classify_write(&label, status, &body, &ALREADY_PUBLISHED)? {
            Ok(PublishOutcome::AlreadyPublished)
        } else {
            Ok(PublishOutcome::Published)
        }
    }

    async fn download(&self, url: &str, dest_dir: &Path, file_name: &str) -> Result<PathBuf> {
        tracing::debug!(url, "downloading artifact");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MirrorError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let path = dest_dir.join(file_name);
        let mut file = tokio::fs::File::create(&path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| MirrorError::transport(url, e))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(path)
    }
}
