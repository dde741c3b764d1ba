use std::time::Duration;
use thiserror::Error;

/// Error types shared by every vsx-mirror crate.
///
/// Registry failures keep the URL that was being accessed so that log lines
/// can be traced back to a concrete request. A registry answering with a
/// well-formed error document is reported as [`MirrorError::Rejected`],
/// distinct from transport failures and bare HTTP status failures.
///
/// # Examples
///
/// ```
/// use vsx_core::error::{MirrorError, Result};
///
/// fn require_token(token: Option<&str>) -> Result<&str> {
///     token.ok_or(MirrorError::MissingToken)
/// }
///
/// assert!(require_token(None).is_err());
/// ```
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("invalid extension identifier '{0}': must have the form 'namespace.name'")]
    InvalidIdentifier(String),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("registry rejected {url} (HTTP {status}): {message}")]
    Rejected {
        url: String,
        status: u16,
        message: String,
    },

    #[error("{id}@{version} has no download URL")]
    MissingDownloadUrl { id: String, version: String },

    #[error("a personal access token is required for write operations")]
    MissingToken,

    #[error("timed out after {timeout:?} while fetching {url}")]
    Timeout { url: String, timeout: Duration },

    #[error("sitemap error: {0}")]
    Sitemap(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MirrorError {
    /// Wraps a reqwest error together with the URL it happened on.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    /// Whether the registry reported the requested resource as absent.
    ///
    /// Open VSX answers unknown extensions with `404` and an error document,
    /// so both the bare status and the rejected form count.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Status { status: 404, .. } | Self::Rejected { status: 404, .. }
        )
    }
}

/// Convenience type alias for `Result<T, MirrorError>`.
pub type Result<T> = std::result::Result<T, MirrorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_identifier_display() {
        let error = MirrorError::InvalidIdentifier("not-a-valid-id".into());
        assert_eq!(
            error.to_string(),
            "invalid extension identifier 'not-a-valid-id': must have the form 'namespace.name'"
        );
    }

    #[test]
    fn test_rejected_display() {
        let error = MirrorError::Rejected {
            url: "http://localhost/api/acme/tool".into(),
            status: 200,
            message: "Extension not found: acme.tool".into(),
        };
        assert!(error.to_string().contains("Extension not found"));
        assert!(error.to_string().contains("HTTP 200"));
    }

    #[test]
    fn test_is_not_found() {
        let status = MirrorError::Status {
            url: "u".into(),
            status: 404,
        };
        assert!(status.is_not_found());

        let rejected = MirrorError::Rejected {
            url: "u".into(),
            status: 404,
            message: "missing".into(),
        };
        assert!(rejected.is_not_found());

        let server = MirrorError::Status {
            url: "u".into(),
            status: 500,
        };
        assert!(!server.is_not_found());
        assert!(!MirrorError::MissingToken.is_not_found());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: MirrorError = io_err.into();
        assert!(error.to_string().contains("I/O error"));
    }

    #[test]
    fn test_missing_download_url() {
        let error = MirrorError::MissingDownloadUrl {
            id: "acme.tool".into(),
            version: "1.0.0".into(),
        };
        assert_eq!(error.to_string(), "acme.tool@1.0.0 has no download URL");
    }
}
