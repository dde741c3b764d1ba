//! Command-line front end for the vsx-mirror sync engine.
//!
//! Wires a validated [`MirrorConfig`] to the engine: builds the upstream and
//! downstream registry clients, collects seed identifiers (explicit ones
//! first, then the upstream sitemap in full-catalog mode) and runs one walk.

pub mod cli;
pub mod config;

pub use config::{MirrorConfig, Overrides};

use std::sync::Arc;
use tracing::info;
use vsx_core::{HttpRegistry, Result};
use vsx_sync::{DependencyWalker, Publisher, SyncReport};

/// Registry clients and engine for one configuration.
pub struct Mirror {
    upstream: Arc<HttpRegistry>,
    walker: DependencyWalker,
    config: MirrorConfig,
}

impl Mirror {
    /// Validates `config` and builds the clients. Performs no network I/O.
    pub fn new(config: MirrorConfig) -> Result<Self> {
        config.validate()?;
        let token = config.token()?.to_string();

        let timeout = config.request_timeout();
        let upstream = Arc::new(HttpRegistry::with_timeout(&config.upstream_url, timeout)?);
        let downstream = Arc::new(HttpRegistry::with_timeout(&config.downstream_url, timeout)?);

        let publisher = Publisher::new(
            upstream.clone(),
            downstream.clone(),
            token,
            config.staging_dir.clone(),
        );
        let walker = DependencyWalker::new(upstream.clone(), downstream, publisher);

        Ok(Self {
            upstream,
            walker,
            config,
        })
    }

    /// Seeds for a walk: `ids` in order, followed by every sitemap entry
    /// when `all` is set.
    pub async fn collect_seeds(&self, ids: &[String], all: bool) -> Result<Vec<String>> {
        let mut seeds = ids.to_vec();
        if all {
            let sitemap_url = self.config.sitemap_url();
            let entries = vsx_sync::discover(
                self.upstream.client(),
                &sitemap_url,
                &self.config.upstream_url,
                &self.config.retry_policy(),
            )
            .await?;
            info!(url = %sitemap_url, count = entries.len(), "collected sitemap seeds");
            seeds.extend(entries.into_iter().map(|entry| entry.id));
        }
        Ok(seeds)
    }

    pub async fn sync(&self, seeds: &[String]) -> SyncReport {
        self.walker.walk(seeds).await
    }
}
