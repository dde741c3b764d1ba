//! Extension identifiers of the form `namespace.name`.

use crate::error::{MirrorError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

static EXTENSION_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([\w\-]+)\.([\w\-]+)$").unwrap());

/// Validated `(namespace, name)` pair.
///
/// The namespace is the part before the first `.`; neither part may be empty
/// or contain another `.`.
///
/// # Examples
///
/// ```
/// use vsx_core::PackageIdentifier;
///
/// let id: PackageIdentifier = "acme.tool".parse().unwrap();
/// assert_eq!(id.namespace(), "acme");
/// assert_eq!(id.name(), "tool");
/// assert_eq!(id.to_string(), "acme.tool");
///
/// assert!("not-a-valid-id".parse::<PackageIdentifier>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageIdentifier {
    namespace: String,
    name: String,
}

impl PackageIdentifier {
    /// Parses a raw identifier string.
    pub fn parse(raw: &str) -> Result<Self> {
        let captures = EXTENSION_ID
            .captures(raw)
            .ok_or_else(|| MirrorError::InvalidIdentifier(raw.to_string()))?;

        Ok(Self {
            namespace: captures[1].to_string(),
            name: captures[2].to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for PackageIdentifier {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PackageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}
