use crate::error::Result;
use crate::types::{PackageMetadata, VersionMetadata};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Result of asking a registry to create a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceOutcome {
    Created,
    /// The registry reported the namespace as already present.
    AlreadyExists,
}

/// Result of publishing an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// The registry already holds this exact version.
    AlreadyPublished,
}

/// Typed access to one registry instance.
///
/// Implementors talk to a single endpoint (upstream or downstream). None of
/// the methods retry; callers decide what a failure means for them. Conflicts
/// on writes ("already exists", "already published") are reported as `Ok`
/// outcomes rather than errors.
///
/// # Examples
///
/// ```no_run
/// use vsx_core::{HttpRegistry, Registry};
///
/// # async fn example() -> vsx_core::Result<()> {
/// let upstream = HttpRegistry::new("https://open-vsx.org")?;
/// let metadata = upstream.get_metadata("golang", "Go").await?;
/// println!("{} has {} versions", metadata.id(), metadata.all_versions.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Registry: Send + Sync {
    /// Base URL this registry talks to, for log output.
    fn url(&self) -> &str;

    /// Fetches the package metadata document for `namespace.name`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The network request fails
    /// - The registry answers with a non-success status
    /// - The document carries an `error` field
    async fn get_metadata(&self, namespace: &str, name: &str) -> Result<PackageMetadata>;

    /// Fetches an arbitrary metadata document, typically a per-version URL
    /// taken from `allVersions`. Same failure contract as `get_metadata`.
    async fn get_document(&self, url: &str) -> Result<VersionMetadata>;

    /// Creates a namespace on this registry.
    async fn create_namespace(&self, name: &str, token: &str) -> Result<NamespaceOutcome>;

    /// Publishes the artifact at `file_path`.
    async fn publish(&self, file_path: &Path, token: &str) -> Result<PublishOutcome>;

    /// Downloads `url` into `dest_dir/file_name` and returns the written path.
    async fn download(&self, url: &str, dest_dir: &Path, file_name: &str) -> Result<PathBuf>;
}
