//! Sync engine for mirroring Open VSX extensions between registries.
//!
//! The engine walks seed identifiers dependency-first and, for each
//! extension, publishes the versions the downstream registry is missing:
//!
//! - [`reconcile`] computes the ordered list of missing versions
//! - [`Publisher`] moves one version across (resolve, download, publish)
//! - [`DependencyWalker`] drives the traversal and builds a [`SyncReport`]
//! - [`sitemap`] discovers the full upstream catalog
//!
//! All mutable bookkeeping lives in a [`SyncState`] owned by one walk, so
//! separate walks never share visited sets or namespace caches.

pub mod publisher;
pub mod reconcile;
pub mod report;
pub mod sitemap;
pub mod state;
pub mod walker;

mod test_utils;

pub use publisher::Publisher;
pub use reconcile::reconcile;
pub use report::{SkipReason, Stage, SyncReport, VersionOutcome};
pub use sitemap::{RetryPolicy, SitemapEntry, discover, parse_sitemap, retry};
pub use state::SyncState;
pub use walker::DependencyWalker;
