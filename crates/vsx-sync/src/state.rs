use std::collections::HashSet;

/// Bookkeeping for one walk.
///
/// Both sets only grow for the lifetime of a walk and are dropped with it.
/// Nothing is persisted: running the walk again is how an interrupted sync
/// is resumed.
#[derive(Debug, Default)]
pub struct SyncState {
    /// Raw identifiers already processed or in progress.
    visited: HashSet<String>,
    /// Namespaces already confirmed, or already attempted, downstream.
    ensured_namespaces: HashSet<String>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `id` as visited. Returns `false` if it already was.
    pub fn mark_visited(&mut self, id: &str) -> bool {
        self.visited.insert(id.to_string())
    }

    /// Records `namespace` as ensured. Returns `false` if it already was,
    /// in which case no creation call is needed.
    pub fn claim_namespace(&mut self, namespace: &str) -> bool {
        self.ensured_namespaces.insert(namespace.to_string())
    }
}
