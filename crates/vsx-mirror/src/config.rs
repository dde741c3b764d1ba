use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vsx_core::{MirrorError, Result};
use vsx_sync::RetryPolicy;

/// Root configuration for a mirror run.
///
/// Loaded from an optional JSON file; every field has a default, so an
/// empty object is a valid configuration (apart from the token, which
/// [`MirrorConfig::validate`] requires).
///
/// # Examples
///
/// ```
/// use vsx_mirror::config::MirrorConfig;
///
/// let json = r#"{
///     "downstream_url": "https://vsx.internal.example",
///     "token": "super_token",
///     "sitemap": { "attempts": 5 }
/// }"#;
///
/// let config: MirrorConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(config.upstream_url, "https://open-vsx.org");
/// assert_eq!(config.sitemap.attempts, 5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,
    #[serde(default = "default_downstream_url")]
    pub downstream_url: String,
    /// Personal access token for the downstream registry.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub sitemap: SitemapConfig,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            upstream_url: default_upstream_url(),
            downstream_url: default_downstream_url(),
            token: None,
            staging_dir: default_staging_dir(),
            request_timeout_secs: default_request_timeout(),
            sitemap: SitemapConfig::default(),
        }
    }
}

/// Sitemap fetch settings for full-catalog mode.
///
/// # Defaults
///
/// - `url`: `<upstream_url>/sitemap.xml`
/// - `timeout_secs`: `15`
/// - `attempts`: `3`
/// - `retry_delay_ms`: `1000`
#[derive(Debug, Clone, Deserialize)]
pub struct SitemapConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_sitemap_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_sitemap_attempts")]
    pub attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_sitemap_timeout(),
            attempts: default_sitemap_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Values that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub upstream_url: Option<String>,
    pub downstream_url: Option<String>,
    pub token: Option<String>,
    pub staging_dir: Option<PathBuf>,
}

impl MirrorConfig {
    /// Reads a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MirrorError::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| MirrorError::Config(format!("invalid {}: {e}", path.display())))
    }

    /// Replaces every field that `overrides` sets.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.upstream_url {
            self.upstream_url = url;
        }
        if let Some(url) = overrides.downstream_url {
            self.downstream_url = url;
        }
        if let Some(token) = overrides.token {
            self.token = Some(token);
        }
        if let Some(dir) = overrides.staging_dir {
            self.staging_dir = dir;
        }
    }

    /// Checks the configuration before any network I/O.
    pub fn validate(&self) -> Result<()> {
        validate_url("upstream_url", &self.upstream_url)?;
        validate_url("downstream_url", &self.downstream_url)?;
        if let Some(url) = &self.sitemap.url {
            validate_url("sitemap.url", url)?;
        }
        if self.sitemap.attempts == 0 {
            return Err(MirrorError::Config("sitemap.attempts must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(MirrorError::Config("request_timeout_secs must be at least 1".into()));
        }
        if self.sitemap.timeout_secs == 0 {
            return Err(MirrorError::Config("sitemap.timeout_secs must be at least 1".into()));
        }
        self.token().map(|_| ())
    }

    /// The downstream token, which every write needs.
    pub fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .ok_or(MirrorError::MissingToken)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn sitemap_url(&self) -> String {
        match &self.sitemap.url {
            Some(url) => url.clone(),
            None => format!("{}/sitemap.xml", self.upstream_url.trim_end_matches('/')),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_secs(self.sitemap.timeout_secs),
            attempts: self.sitemap.attempts,
            delay: Duration::from_millis(self.sitemap.retry_delay_ms),
        }
    }
}

fn validate_url(field: &str, url: &str) -> Result<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.trim_matches('/').is_empty() => Ok(()),
        _ => Err(MirrorError::Config(format!("{field} must be an http(s) URL, got {url:?}"))),
    }
}

// Default value functions
fn default_upstream_url() -> String {
    "https://open-vsx.org".to_string()
}

fn default_downstream_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_staging_dir() -> PathBuf {
    std::env::temp_dir().join("crawl-open-vsx")
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_sitemap_timeout() -> u64 {
    15
}

const fn default_sitemap_attempts() -> u32 {
    3
}

const fn default_retry_delay_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_token() -> MirrorConfig {
        MirrorConfig {
            token: Some("secret".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = MirrorConfig::default();
        assert_eq!(config.upstream_url, "https://open-vsx.org");
        assert_eq!(config.downstream_url, "http://localhost:8080");
        assert!(config.token.is_none());
        assert!(config.staging_dir.ends_with("crawl-open-vsx"));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.sitemap_url(), "https://open-vsx.org/sitemap.xml");
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: MirrorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.upstream_url, "https://open-vsx.org");
        assert_eq!(config.sitemap.attempts, 3);
        assert_eq!(config.sitemap.retry_delay_ms, 1000);
    }

    #[test]
    fn test_full_config_deserialization() {
        let json = r#"{
            "upstream_url": "https://mirror.example/",
            "downstream_url": "https://vsx.internal.example",
            "token": "abc",
            "staging_dir": "/var/tmp/vsx",
            "request_timeout_secs": 120,
            "sitemap": {
                "url": "https://mirror.example/custom-sitemap.xml",
                "timeout_secs": 60,
                "attempts": 5,
                "retry_delay_ms": 250
            }
        }"#;

        let config: MirrorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.token().unwrap(), "abc");
        assert_eq!(config.staging_dir, PathBuf::from("/var/tmp/vsx"));
        assert_eq!(config.request_timeout_secs, 120);
        assert_eq!(
            config.sitemap_url(),
            "https://mirror.example/custom-sitemap.xml"
        );
        assert_eq!(
            config.retry_policy(),
            RetryPolicy {
                timeout: Duration::from_secs(60),
                attempts: 5,
                delay: Duration::from_millis(250),
            }
        );
    }

    #[test]
    fn test_sitemap_url_follows_upstream() {
        let config = MirrorConfig {
            upstream_url: "https://mirror.example/".into(),
            ..Default::default()
        };
        assert_eq!(config.sitemap_url(), "https://mirror.example/sitemap.xml");
    }

    #[test]
    fn test_overrides_replace_only_set_fields() {
        let mut config = with_token();
        config.apply(Overrides {
            downstream_url: Some("https://vsx.internal.example".into()),
            staging_dir: Some(PathBuf::from("/srv/staging")),
            ..Default::default()
        });

        assert_eq!(config.upstream_url, "https://open-vsx.org");
        assert_eq!(config.downstream_url, "https://vsx.internal.example");
        assert_eq!(config.token().unwrap(), "secret");
        assert_eq!(config.staging_dir, PathBuf::from("/srv/staging"));
    }

    #[test]
    fn test_validate_accepts_defaults_with_token() {
        assert!(with_token().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_token() {
        let err = MirrorConfig::default().validate().unwrap_err();
        assert!(matches!(err, MirrorError::MissingToken));

        let blank = MirrorConfig {
            token: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(blank.validate(), Err(MirrorError::MissingToken)));
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        for url in ["", "localhost:8080", "ftp://example.com", "https://"] {
            let config = MirrorConfig {
                downstream_url: url.into(),
                ..with_token()
            };
            let err = config.validate().unwrap_err();
            assert!(
                err.to_string().contains("downstream_url"),
                "{url:?} gave {err}"
            );
        }
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = with_token();
        config.sitemap.attempts = 0;
        assert!(matches!(config.validate(), Err(MirrorError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = with_token();
        config.request_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, MirrorError::Config(ref m) if m.contains("request_timeout_secs")));

        let mut config = with_token();
        config.sitemap.timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, MirrorError::Config(ref m) if m.contains("sitemap.timeout_secs")));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.json");
        std::fs::write(&path, r#"{ "token": "from-file" }"#).unwrap();

        let config = MirrorConfig::load(&path).unwrap();
        assert_eq!(config.token().unwrap(), "from-file");
        assert_eq!(config.downstream_url, "http://localhost:8080");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = MirrorConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, MirrorError::Config(ref m) if m.contains("cannot read")));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = MirrorConfig::load(&path).unwrap_err();
        assert!(matches!(err, MirrorError::Config(ref m) if m.contains("invalid")));
    }
}
