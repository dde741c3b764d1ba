//! Dependency-first traversal of the extensions to mirror.
//!
//! Each identifier goes through: visited check → parse → upstream metadata →
//! dependencies (recursively, one at a time) → downstream snapshot →
//! reconcile → publish each missing version in order. Any failure ends
//! processing of that identifier only.

use crate::publisher::Publisher;
use crate::reconcile::reconcile;
use crate::report::SyncReport;
use crate::state::SyncState;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, info, warn};
use vsx_core::{PackageIdentifier, Registry};

/// Everything one walk mutates.
#[derive(Default)]
struct Walk {
    state: SyncState,
    report: SyncReport,
}

/// Drives a sync from seed identifiers through their transitive
/// dependencies.
///
/// Work is strictly sequential: one registry request is in flight at a
/// time, and sibling dependencies and versions are handled in declared
/// order.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use vsx_core::HttpRegistry;
/// use vsx_sync::{DependencyWalker, Publisher};
///
/// # async fn example() -> vsx_core::Result<()> {
/// let upstream = Arc::new(HttpRegistry::new("https://open-vsx.org")?);
/// let downstream = Arc::new(HttpRegistry::new("http://localhost:8080")?);
/// let publisher = Publisher::new(
///     upstream.clone(),
///     downstream.clone(),
///     "super_token",
///     std::env::temp_dir().join("crawl-open-vsx"),
/// );
///
/// let walker = DependencyWalker::new(upstream, downstream, publisher);
/// let report = walker.walk(&["golang.Go".to_string()]).await;
/// println!("{report}");
/// # Ok(())
/// # }
/// ```
pub struct DependencyWalker {
    upstream: Arc<dyn Registry>,
    downstream: Arc<dyn Registry>,
    publisher: Publisher,
}

impl DependencyWalker {
    pub fn new(
        upstream: Arc<dyn Registry>,
        downstream: Arc<dyn Registry>,
        publisher: Publisher,
    ) -> Self {
        Self {
            upstream,
            downstream,
            publisher,
        }
    }

    /// Walks `seeds` in order with fresh per-walk state.
    pub async fn walk(&self, seeds: &[String]) -> SyncReport {
        let mut walk = Walk::default();
        for seed in seeds {
            self.sync_package(&mut walk, seed).await;
        }

        info!(
            packages = walk.report.packages,
            synced = walk.report.synced,
            skipped = walk.report.skipped,
            failed = walk.report.failed,
            invalid = walk.report.invalid_identifiers,
            unresolved = walk.report.unresolved,
            "walk finished"
        );
        walk.report
    }

    fn sync_package<'a>(&'a self, walk: &'a mut Walk, raw: &'a str) -> BoxFuture<'a, ()> {
        async move {
            // Marked before recursing so that a cycle back to this package
            // stops here.
            if !walk.state.mark_visited(raw) {
                return;
            }
            walk.report.packages += 1;

            let id = match PackageIdentifier::parse(raw) {
                Ok(id) => id,
                Err(error) => {
                    warn!(id = raw, %error, "skipping extension");
                    walk.report.invalid_identifiers += 1;
                    return;
                }
            };

            let upstream = match self.upstream.get_metadata(id.namespace(), id.name()).await {
                Ok(metadata) => metadata,
                Err(error) => {
                    warn!(id = %id, %error, "failed to resolve extension");
                    walk.report.unresolved += 1;
                    return;
                }
            };

            for dependency in &upstream.dependencies {
                self.sync_package(walk, dependency).await;
            }

            let downstream = match self
                .downstream
                .get_metadata(id.namespace(), id.name())
                .await
            {
                Ok(metadata) => {
                    // Present downstream means its namespace exists too.
                    walk.state.claim_namespace(id.namespace());
                    Some(metadata)
                }
                Err(error) if error.is_not_found() => {
                    debug!(id = %id, "not yet present downstream");
                    None
                }
                Err(error) => {
                    warn!(
                        id = %id,
                        registry = self.downstream.url(),
                        %error,
                        "failed to resolve extension downstream, treating as absent"
                    );
                    None
                }
            };

            let plan = reconcile(&upstream, downstream.as_ref());
            if plan.is_empty() {
                debug!(id = %id, "up to date");
            }

            for link in plan {
                let outcome = self
                    .publisher
                    .publish_version(
                        &mut walk.state,
                        &id,
                        &link.version,
                        &link.url,
                        downstream.as_ref(),
                    )
                    .await;
                walk.report.record(&outcome);
            }
        }
        .boxed()
    }
}
