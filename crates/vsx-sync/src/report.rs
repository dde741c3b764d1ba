//! Per-version outcomes and the summary of a walk.

use std::fmt;
use vsx_core::MirrorError;

/// Step of the publish pipeline a version failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Fetching the version document from upstream.
    Resolve,
    /// Staging the artifact locally (including a missing download URL).
    Download,
    /// Publishing to the downstream registry.
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolve => "resolve",
            Self::Download => "download",
            Self::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// Why a version was not published even though nothing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The resolved version is already in the downstream snapshot.
    AlreadyPresent,
    /// Downstream answered the publish with "already published".
    AlreadyPublished,
}

/// Outcome of syncing one version.
#[derive(Debug)]
pub enum VersionOutcome {
    Synced,
    Skipped(SkipReason),
    Failed { stage: Stage, error: MirrorError },
}

/// Counters accumulated over one walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Identifiers taken out of the queue for processing, deduplicated.
    pub packages: usize,
    pub invalid_identifiers: usize,
    /// Packages whose upstream metadata could not be resolved.
    pub unresolved: usize,
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SyncReport {
    pub fn record(&mut self, outcome: &VersionOutcome) {
        match outcome {
            VersionOutcome::Synced => self.synced += 1,
            VersionOutcome::Skipped(_) => self.skipped += 1,
            VersionOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Whether any package or version could not be processed.
    pub fn has_failures(&self) -> bool {
        self.invalid_identifiers + self.unresolved + self.failed > 0
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} packages: {} versions published, {} skipped, {} failed; {} invalid identifiers, {} unresolved packages",
            self.packages,
            self.synced,
            self.skipped,
            self.failed,
            self.invalid_identifiers,
            self.unresolved
        )
    }
}
