//! Registry data model.
//!
//! Registries answer every metadata request with the same JSON document
//! shape. [`ExtensionJson`] is that wire shape; [`decode_extension`] turns a
//! response body into a [`Lookup`], separating documents that carry an
//! embedded `error` field from real metadata before anything else looks at
//! them. [`PackageMetadata`] and [`VersionMetadata`] are the views the sync
//! engine works with.

use crate::error::{MirrorError, Result};
use serde::Deserialize;
use serde_json::Value;

/// Target platform value meaning "runs everywhere".
pub const UNIVERSAL_TARGET: &str = "universal";

/// A registry response that was either usable or an explicit error document.
///
/// Registries may answer `200 OK` with `{"error": "..."}`; decoding into this
/// type keeps that case out of the success path.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Rejected(String),
}

impl<T> Lookup<T> {
    /// Converts into a `Result`, attributing a rejection to `url`/`status`.
    pub fn into_result(self, url: &str, status: u16) -> Result<T> {
        match self {
            Self::Found(value) => Ok(value),
            Self::Rejected(message) => Err(MirrorError::Rejected {
                url: url.to_string(),
                status,
                message,
            }),
        }
    }
}

/// Extension document as served by `/api/{namespace}/{name}` and by the
/// per-version URLs listed in `allVersions`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionJson {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Version → document URL, in document order.
    #[serde(default)]
    pub all_versions: serde_json::Map<String, Value>,
    #[serde(default)]
    pub version_alias: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<DependencyJson>,
    #[serde(default)]
    pub files: FilesJson,
    #[serde(default)]
    pub target_platform: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DependencyJson {
    pub namespace: String,
    pub extension: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilesJson {
    #[serde(default)]
    pub download: Option<String>,
}

/// Decodes a registry response body, splitting off embedded error documents.
pub fn decode_extension(body: &[u8]) -> Result<Lookup<ExtensionJson>> {
    let json: ExtensionJson = serde_json::from_slice(body)?;
    Ok(match json.error {
        Some(message) => Lookup::Rejected(message),
        None => Lookup::Found(json),
    })
}

/// Extracts the `error` message from an arbitrary response body, if any.
pub fn error_message(body: &[u8]) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorJson {
        error: Option<String>,
    }

    serde_json::from_slice::<ErrorJson>(body)
        .ok()
        .and_then(|json| json.error)
}

/// One entry of a package's `allVersions` map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionLink {
    pub version: String,
    pub url: String,
}

/// A registry's view of one package, as fetched at one moment of a walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    pub namespace: String,
    pub name: String,
    /// All versions in the order the registry listed them.
    pub all_versions: Vec<VersionLink>,
    /// Symbolic labels such as `latest` or `pre-release`.
    pub version_aliases: Vec<String>,
    /// Declared dependencies as `namespace.name` strings, unvalidated.
    pub dependencies: Vec<String>,
}

impl PackageMetadata {
    pub fn has_version(&self, version: &str) -> bool {
        self.all_versions.iter().any(|v| v.version == version)
    }

    pub fn is_alias(&self, version: &str) -> bool {
        self.version_aliases.iter().any(|a| a == version)
    }

    pub fn id(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

impl From<ExtensionJson> for PackageMetadata {
    fn from(json: ExtensionJson) -> Self {
        let all_versions = json
            .all_versions
            .into_iter()
            .filter_map(|(version, url)| match url {
                Value::String(url) => Some(VersionLink { version, url }),
                _ => None,
            })
            .collect();

        Self {
            namespace: json.namespace.unwrap_or_default(),
            name: json.name.unwrap_or_default(),
            all_versions,
            version_aliases: json.version_alias,
            dependencies: json
                .dependencies
                .iter()
                .map(|dep| format!("{}.{}", dep.namespace, dep.extension))
                .collect(),
        }
    }
}

/// Resolved detail of one concrete version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionMetadata {
    pub namespace: String,
    pub name: String,
    /// Concrete version; may differ from the label used to look it up.
    pub version: String,
    pub download_url: Option<String>,
    pub target_platform: Option<String>,
}

impl VersionMetadata {
    /// File name the artifact is staged under.
    ///
    /// Path separators coming from registry data are replaced with `_`, so
    /// the name always stays a single path component.
    ///
    /// ```
    /// use vsx_core::VersionMetadata;
    ///
    /// let version = VersionMetadata {
    ///     namespace: "acme".into(),
    ///     name: "tool".into(),
    ///     version: "1.0.0".into(),
    ///     target_platform: Some("linux-x64".into()),
    ///     ..Default::default()
    /// };
    /// assert_eq!(version.artifact_file_name(), "acme.tool-1.0.0@linux-x64.vsix");
    /// ```
    pub fn artifact_file_name(&self) -> String {
        let namespace = path_safe(&self.namespace);
        let name = path_safe(&self.name);
        let version = path_safe(&self.version);
        match self.target_platform.as_deref() {
            Some(target) if !target.is_empty() && target != UNIVERSAL_TARGET => format!(
                "{namespace}.{name}-{version}@{}.vsix",
                path_safe(target)
            ),
            _ => format!("{namespace}.{name}-{version}.vsix"),
        }
    }
}

impl From<ExtensionJson> for VersionMetadata {
    fn from(json: ExtensionJson) -> Self {
        Self {
            namespace: json.namespace.unwrap_or_default(),
            name: json.name.unwrap_or_default(),
            version: json.version.unwrap_or_default(),
            download_url: json.files.download.filter(|url| !url.is_empty()),
            target_platform: json.target_platform,
        }
    }
}

fn path_safe(part: &str) -> String {
    part.replace(['/', '\\'], "_")
}
