//! Full-catalog discovery from the upstream sitemap.
//!
//! The sitemap lists one `<url>` entry per extension, with a `loc` of the
//! form `{base}/extension/{namespace}/{name}` and a `lastmod` date.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use vsx_core::{MirrorError, Result};

static URL_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<url(?:\s[^>]*)?>(.*?)</url>").unwrap());
static LOC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<loc(?:\s[^>]*)?>\s*(.*?)\s*</loc>").unwrap());
static LASTMOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<lastmod(?:\s[^>]*)?>\s*(.*?)\s*</lastmod>").unwrap());

/// One extension listed in the sitemap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    pub last_modified: String,
    /// `namespace.name`, unvalidated.
    pub id: String,
}

/// How the sitemap fetch is bounded and retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Per-attempt time limit.
    pub timeout: Duration,
    pub attempts: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Runs `task` up to `attempts` times, sleeping `delay` between failures,
/// and returns the last error if every attempt fails.
pub async fn retry<T, F, Fut>(mut task: F, delay: Duration, attempts: u32) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match task().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < attempts => {
                debug!(attempt, attempts, %error, "attempt failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

/// Fetches the sitemap document as text.
pub async fn fetch_sitemap(client: &Client, url: &str, policy: &RetryPolicy) -> Result<String> {
    retry(
        || fetch_once(client, url, policy.timeout),
        policy.delay,
        policy.attempts,
    )
    .await
}

async fn fetch_once(client: &Client, url: &str, timeout: Duration) -> Result<String> {
    let request = async {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| MirrorError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| MirrorError::transport(url, e))
    };

    tokio::time::timeout(timeout, request)
        .await
        .map_err(|_| MirrorError::Timeout {
            url: url.to_string(),
            timeout,
        })?
}

/// Extracts extension entries from sitemap XML.
///
/// `base_url` is the registry the sitemap belongs to; entries pointing
/// elsewhere are ignored. Element text may be wrapped in CDATA or use the
/// predefined XML entities.
///
/// ```
/// use vsx_sync::sitemap::parse_sitemap;
///
/// let xml = r#"<urlset>
///   <url><loc>https://open-vsx.org/extension/golang/Go</loc><lastmod>2024-05-01</lastmod></url>
/// </urlset>"#;
///
/// let entries = parse_sitemap(xml, "https://open-vsx.org");
/// assert_eq!(entries[0].id, "golang.Go");
/// assert_eq!(entries[0].last_modified, "2024-05-01");
/// ```
pub fn parse_sitemap(xml: &str, base_url: &str) -> Vec<SitemapEntry> {
    let prefix = format!("{}/extension/", base_url.trim_end_matches('/'));

    URL_ENTRY
        .captures_iter(xml)
        .filter_map(|entry| {
            let body = entry.get(1)?.as_str();
            let loc = text_value(LOC.captures(body)?.get(1)?.as_str());
            let Some(path) = loc.strip_prefix(&prefix) else {
                debug!(loc = %loc, "ignoring sitemap entry outside the registry");
                return None;
            };
            let last_modified = LASTMOD
                .captures(body)
                .and_then(|c| c.get(1))
                .map(|m| text_value(m.as_str()))
                .unwrap_or_default();

            Some(SitemapEntry {
                last_modified,
                id: path.replacen('/', ".", 1),
            })
        })
        .collect()
}

/// Unwraps CDATA or decodes the predefined entities of an element's text.
fn text_value(raw: &str) -> String {
    if let Some(inner) = raw
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
    {
        return inner.trim().to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Fetches and parses the sitemap of `base_url`.
///
/// A document listing no extensions of `base_url` is an error: it is either
/// not a sitemap or not the one for this registry.
pub async fn discover(
    client: &Client,
    sitemap_url: &str,
    base_url: &str,
    policy: &RetryPolicy,
) -> Result<Vec<SitemapEntry>> {
    let xml = fetch_sitemap(client, sitemap_url, policy).await?;
    let entries = parse_sitemap(&xml, base_url);
    if entries.is_empty() {
        return Err(MirrorError::Sitemap(format!(
            "{sitemap_url} lists no extensions of {base_url}"
        )));
    }
    Ok(entries)
}
