//! Version reconciliation between an upstream and a downstream snapshot.

use vsx_core::{PackageMetadata, VersionLink};

/// Computes the versions of `upstream` that are missing downstream.
///
/// Upstream's `allVersions` entries are visited in reverse document order.
/// Open VSX lists newest first, so the result is normally oldest first and
/// the downstream "latest" pointer ends on the newest version. Alias labels
/// are never selected on their own; they resolve to a concrete version when
/// that version's document is fetched.
///
/// The plan depends only on the two snapshots, so running it again after a
/// partial sync yields exactly the versions that are still missing.
///
/// # Examples
///
/// ```
/// use vsx_core::{PackageMetadata, VersionLink};
/// use vsx_sync::reconcile;
///
/// let link = |v: &str| VersionLink { version: v.into(), url: format!("u/{v}") };
/// let upstream = PackageMetadata {
///     all_versions: vec![link("latest"), link("1.1.0"), link("1.0.0")],
///     version_aliases: vec!["latest".into()],
///     ..Default::default()
/// };
///
/// let plan: Vec<_> = reconcile(&upstream, None).iter().map(|l| l.version.as_str()).collect();
/// assert_eq!(plan, vec!["1.0.0", "1.1.0"]);
/// ```
pub fn reconcile<'a>(
    upstream: &'a PackageMetadata,
    downstream: Option<&PackageMetadata>,
) -> Vec<&'a VersionLink> {
    upstream
        .all_versions
        .iter()
        .rev()
        .filter(|link| !upstream.is_alias(&link.version))
        .filter(|link| !downstream.is_some_and(|d| d.has_version(&link.version)))
        .collect()
}
