//! Download → ensure namespace → publish pipeline for a single version.
//!
//! Every failure is turned into a [`VersionOutcome`]; nothing here returns an
//! error to the walker.

use crate::report::{SkipReason, Stage, VersionOutcome};
use crate::state::SyncState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vsx_core::{
    MirrorError, NamespaceOutcome, PackageIdentifier, PackageMetadata, PublishOutcome, Registry,
    VersionMetadata,
};

const STAGING_PREFIX: &str = "vsx-";

/// Moves one version from the upstream registry to the downstream one.
pub struct Publisher {
    upstream: Arc<dyn Registry>,
    downstream: Arc<dyn Registry>,
    token: String,
    staging_dir: PathBuf,
}

impl Publisher {
    /// `staging_dir` is created on first use. Each attempt stages into its
    /// own unique subdirectory, removed when the attempt ends.
    pub fn new(
        upstream: Arc<dyn Registry>,
        downstream: Arc<dyn Registry>,
        token: impl Into<String>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            upstream,
            downstream,
            token: token.into(),
            staging_dir: staging_dir.into(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Syncs `label` of package `id`, whose version document lives at
    /// `document_url`.
    ///
    /// The fetched document's own `version` is authoritative: an alias label
    /// resolves to a concrete version, and if that version is already in
    /// `downstream` the attempt is skipped.
    pub async fn publish_version(
        &self,
        state: &mut SyncState,
        id: &PackageIdentifier,
        label: &str,
        document_url: &str,
        downstream: Option<&PackageMetadata>,
    ) -> VersionOutcome {
        let mut version = match self.upstream.get_document(document_url).await {
            Ok(version) => version,
            Err(error) => {
                warn!(id = %id, version = label, %error, "failed to resolve extension version");
                return VersionOutcome::Failed {
                    stage: Stage::Resolve,
                    error,
                };
            }
        };
        fill_identity(&mut version, id, label);

        let Some(download_url) = version.download_url.clone() else {
            let error = MirrorError::MissingDownloadUrl {
                id: id.to_string(),
                version: version.version.clone(),
            };
            warn!(id = %id, version = %version.version, %error, "failed to download extension");
            return VersionOutcome::Failed {
                stage: Stage::Download,
                error,
            };
        };

        if downstream.is_some_and(|d| d.has_version(&version.version)) {
            debug!(id = %id, version = %version.version, "skipping, already published");
            return VersionOutcome::Skipped(SkipReason::AlreadyPresent);
        }

        let workdir = match self.create_workdir().await {
            Ok(workdir) => workdir,
            Err(error) => {
                warn!(
                    id = %id,
                    version = %version.version,
                    %error,
                    "failed to create staging directory"
                );
                return VersionOutcome::Failed {
                    stage: Stage::Download,
                    error,
                };
            }
        };

        let outcome = self
            .stage_and_publish(state, id, &version, &download_url, workdir.path())
            .await;

        let path = workdir.path().to_path_buf();
        if let Err(error) = workdir.close() {
            warn!(path = %path.display(), %error, "failed to remove staging directory");
        }

        outcome
    }

    async fn create_workdir(&self) -> Result<tempfile::TempDir, MirrorError> {
        tokio::fs::create_dir_all(&self.staging_dir).await?;
        let workdir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.staging_dir)?;
        Ok(workdir)
    }

    async fn stage_and_publish(
        &self,
        state: &mut SyncState,
        id: &PackageIdentifier,
        version: &VersionMetadata,
        download_url: &str,
        workdir: &Path,
    ) -> VersionOutcome {
        let artifact = match self
            .upstream
            .download(download_url, workdir, &version.artifact_file_name())
            .await
        {
            Ok(path) => path,
            Err(error) => {
                warn!(id = %id, version = %version.version, %error, "failed to download extension");
                return VersionOutcome::Failed {
                    stage: Stage::Download,
                    error,
                };
            }
        };

        self.ensure_namespace(state, &version.namespace).await;

        match self.downstream.publish(&artifact, &self.token).await {
            Ok(PublishOutcome::Published) => {
                info!(id = %id, version = %version.version, "published extension");
                VersionOutcome::Synced
            }
            Ok(PublishOutcome::AlreadyPublished) => {
                debug!(id = %id, version = %version.version, "skipping, already published");
                VersionOutcome::Skipped(SkipReason::AlreadyPublished)
            }
            Err(error) => {
                warn!(id = %id, version = %version.version, %error, "failed to publish extension");
                VersionOutcome::Failed {
                    stage: Stage::Publish,
                    error,
                }
            }
        }
    }

    /// Creates `namespace` downstream unless this walk already did.
    ///
    /// A failure is logged and otherwise ignored; the publish that follows
    /// is attempted anyway and the registry decides.
    async fn ensure_namespace(&self, state: &mut SyncState, namespace: &str) {
        if !state.claim_namespace(namespace) {
            return;
        }

        match self.downstream.create_namespace(namespace, &self.token).await {
            Ok(NamespaceOutcome::Created) => info!(namespace, "created namespace"),
            Ok(NamespaceOutcome::AlreadyExists) => debug!(namespace, "namespace already exists"),
            Err(error) => warn!(namespace, %error, "failed to create namespace"),
        }
    }
}

/// Fills identity fields a version document left out from the package that
/// referenced it.
fn fill_identity(version: &mut VersionMetadata, id: &PackageIdentifier, label: &str) {
    if version.namespace.is_empty() {
        version.namespace = id.namespace().to_string();
    }
    if version.name.is_empty() {
        version.name = id.name().to_string();
    }
    if version.version.is_empty() {
        version.version = label.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::{Call, FakeRegistry, document_url, download_url};

    struct Fixture {
        upstream: Arc<FakeRegistry>,
        downstream: Arc<FakeRegistry>,
        publisher: Publisher,
        staging: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let upstream = Arc::new(FakeRegistry::new("memory://upstream"));
        let downstream = Arc::new(FakeRegistry::new("memory://downstream"));
        let staging = tempfile::tempdir().unwrap();
        let publisher = Publisher::new(
            upstream.clone(),
            downstream.clone(),
            "token",
            staging.path().join("crawl"),
        );
        Fixture {
            upstream,
            downstream,
            publisher,
            staging,
        }
    }

    fn id(raw: &str) -> PackageIdentifier {
        raw.parse().unwrap()
    }

    fn staged_entries(fixture: &Fixture) -> usize {
        std::fs::read_dir(fixture.publisher.staging_dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_publishes_and_creates_namespace() {
        let f = fixture();
        f.upstream.add_package("acme.tool", &["1.0.0"], &[]);
        let mut state = SyncState::new();

        let outcome = f
            .publisher
            .publish_version(
                &mut state,
                &id("acme.tool"),
                "1.0.0",
                &document_url("acme.tool", "1.0.0"),
                None,
            )
            .await;

        assert!(matches!(outcome, VersionOutcome::Synced));
        assert_eq!(f.downstream.published(), vec!["acme.tool@1.0.0"]);
        assert_eq!(f.downstream.namespace_creations(), vec!["acme"]);
        assert!(!state.claim_namespace("acme"));
        assert_eq!(staged_entries(&f), 0);
        assert!(f.staging.path().join("crawl").is_dir());
    }

    #[tokio::test]
    async fn test_namespace_created_once_per_walk() {
        let f = fixture();
        f.upstream.add_package("acme.tool", &["1.1.0", "1.0.0"], &[]);
        let mut state = SyncState::new();

        for version in ["1.0.0", "1.1.0"] {
            let outcome = f
                .publisher
                .publish_version(
                    &mut state,
                    &id("acme.tool"),
                    version,
                    &document_url("acme.tool", version),
                    None,
                )
                .await;
            assert!(matches!(outcome, VersionOutcome::Synced));
        }

        assert_eq!(f.downstream.namespace_creations(), vec!["acme"]);
    }

    #[tokio::test]
    async fn test_namespace_failure_still_publishes() {
        let f = fixture();
        f.upstream.add_package("acme.tool", &["1.0.0"], &[]);
        f.downstream.fail_namespace("acme");
        let mut state = SyncState::new();

        let outcome = f
            .publisher
            .publish_version(
                &mut state,
                &id("acme.tool"),
                "1.0.0",
                &document_url("acme.tool", "1.0.0"),
                None,
            )
            .await;

        assert!(matches!(outcome, VersionOutcome::Synced));
        assert_eq!(f.downstream.namespace_creations(), vec!["acme"]);
        assert_eq!(f.downstream.published(), vec!["acme.tool@1.0.0"]);
    }

    #[tokio::test]
    async fn test_cleanup_failure_keeps_outcome() {
        let f = fixture();
        f.upstream.add_package("acme.tool", &["1.0.0"], &[]);
        f.downstream.remove_staged_on_publish();
        let mut state = SyncState::new();

        let outcome = f
            .publisher
            .publish_version(
                &mut state,
                &id("acme.tool"),
                "1.0.0",
                &document_url("acme.tool", "1.0.0"),
                None,
            )
            .await;

        assert!(matches!(outcome, VersionOutcome::Synced));
        assert_eq!(f.downstream.published(), vec!["acme.tool@1.0.0"]);
        assert_eq!(staged_entries(&f), 0);
    }

    #[tokio::test]
    async fn test_alias_resolving_to_present_version_is_skipped() {
        let f = fixture();
        f.upstream.add_package("acme.tool", &["1.0.0"], &[]);
        f.upstream.add_alias("acme.tool", "preview", "1.0.0");
        f.downstream.add_package("acme.tool", &["1.0.0"], &[]);
        let downstream = f.downstream.get_metadata("acme", "tool").await.unwrap();
        let mut state = SyncState::new();

        let outcome = f
            .publisher
            .publish_version(
                &mut state,
                &id("acme.tool"),
                "preview",
                &document_url("acme.tool", "preview"),
                Some(&downstream),
            )
            .await;

        assert!(matches!(
            outcome,
            VersionOutcome::Skipped(SkipReason::AlreadyPresent)
        ));
        assert!(f.upstream.calls().iter().all(|c| !matches!(c, Call::Download(_))));
        assert!(f.downstream.published().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_failure() {
        let f = fixture();
        f.upstream.add_package("acme.tool", &["1.0.0"], &[]);
        f.upstream.fail_url(&document_url("acme.tool", "1.0.0"));
        let mut state = SyncState::new();

        let outcome = f
            .publisher
            .publish_version(
                &mut state,
                &id("acme.tool"),
                "1.0.0",
                &document_url("acme.tool", "1.0.0"),
                None,
            )
            .await;

        assert!(matches!(
            outcome,
            VersionOutcome::Failed {
                stage: Stage::Resolve,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_download_url_is_not_downloaded() {
        let f = fixture();
        f.upstream.add_package("acme.tool", &["1.0.0"], &[]);
        f.upstream.remove_download_url("acme.tool", "1.0.0");
        let mut state = SyncState::new();

        let outcome = f
            .publisher
            .publish_version(
                &mut state,
                &id("acme.tool"),
                "1.0.0",
                &document_url("acme.tool", "1.0.0"),
                None,
            )
            .await;

        match outcome {
            VersionOutcome::Failed {
                stage: Stage::Download,
                error: MirrorError::MissingDownloadUrl { id, version },
            } => {
                assert_eq!(id, "acme.tool");
                assert_eq!(version, "1.0.0");
            }
            other => panic!("Expected missing download URL, got {other:?}"),
        }
        assert!(f.upstream.calls().iter().all(|c| !matches!(c, Call::Download(_))));
        assert!(f.downstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_download_failure_cleans_up() {
        let f = fixture();
        f.upstream.add_package("acme.tool", &["1.0.0"], &[]);
        f.upstream.fail_url(&download_url("acme.tool", "1.0.0"));
        let mut state = SyncState::new();

        let outcome = f
            .publisher
            .publish_version(
                &mut state,
                &id("acme.tool"),
                "1.0.0",
                &document_url("acme.tool", "1.0.0"),
                None,
            )
            .await;

        assert!(matches!(
            outcome,
            VersionOutcome::Failed {
                stage: Stage::Download,
                ..
            }
        ));
        assert!(f.downstream.calls().is_empty());
        assert_eq!(staged_entries(&f), 0);
    }

    #[tokio::test]
    async fn test_already_published_is_skipped() {
        let f = fixture();
        f.upstream.add_package("acme.tool", &["1.0.0"], &[]);
        f.downstream.hide_published("acme.tool@1.0.0");
        let mut state = SyncState::new();

        let outcome = f
            .publisher
            .publish_version(
                &mut state,
                &id("acme.tool"),
                "1.0.0",
                &document_url("acme.tool", "1.0.0"),
                None,
            )
            .await;

        assert!(matches!(
            outcome,
            VersionOutcome::Skipped(SkipReason::AlreadyPublished)
        ));
        assert_eq!(staged_entries(&f), 0);
    }

    #[tokio::test]
    async fn test_existing_namespace_is_not_a_failure() {
        let f = fixture();
        f.upstream.add_package("acme.tool", &["1.0.0"], &[]);
        f.downstream.add_package("acme.other", &["0.1.0"], &[]);
        let mut state = SyncState::new();

        let outcome = f
            .publisher
            .publish_version(
                &mut state,
                &id("acme.tool"),
                "1.0.0",
                &document_url("acme.tool", "1.0.0"),
                None,
            )
            .await;

        assert!(matches!(outcome, VersionOutcome::Synced));
        assert_eq!(f.downstream.namespace_creations(), vec!["acme"]);
    }

    #[tokio::test]
    async fn test_publish_failure() {
        let f = fixture();
        f.upstream.add_package("acme.tool", &["1.0.0"], &[]);
        f.downstream.fail_publish("acme.tool@1.0.0");
        let mut state = SyncState::new();

        let outcome = f
            .publisher
            .publish_version(
                &mut state,
                &id("acme.tool"),
                "1.0.0",
                &document_url("acme.tool", "1.0.0"),
                None,
            )
            .await;

        assert!(matches!(
            outcome,
            VersionOutcome::Failed {
                stage: Stage::Publish,
                ..
            }
        ));
        assert_eq!(staged_entries(&f), 0);
    }

    #[test]
    fn test_fill_identity() {
        let mut version = VersionMetadata::default();
        fill_identity(&mut version, &id("acme.tool"), "1.2.3");
        assert_eq!(version.namespace, "acme");
        assert_eq!(version.name, "tool");
        assert_eq!(version.version, "1.2.3");

        let mut resolved = VersionMetadata {
            version: "1.0.0".into(),
            ..Default::default()
        };
        fill_identity(&mut resolved, &id("acme.tool"), "latest");
        assert_eq!(resolved.version, "1.0.0");
    }
}
