//! Remote content for `file()` calls with `http://` or `https://` paths.

use std::fmt;
use std::time::Duration;

use ureq::Agent;

/// Default timeout for URL reads.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking URL reader.
///
/// Failures are rendered inline as `URL read error: <url>\n`, never returned.
pub trait Fetch: Send + Sync + fmt::Debug {
    fn fetch(&self, url: &str) -> String;
}

/// Check whether `path` should be fetched instead of read from disk.
pub fn is_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

pub(crate) fn url_read_error(url: &str) -> String {
    format!("URL read error: {url}\n")
}

/// [`Fetch`] over a reusable `ureq` agent.
pub struct UreqFetcher {
    agent: Agent,
}

impl UreqFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: Agent::config_builder()
                .timeout_global(Some(timeout))
                .http_status_as_error(false)
                .build()
                .into(),
        }
    }
}

impl Default for UreqFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl fmt::Debug for UreqFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqFetcher").finish_non_exhaustive()
    }
}

impl Fetch for UreqFetcher {
    fn fetch(&self, url: &str) -> String {
        tracing::debug!(url, "fetching url");

        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url, error = %e, "url request failed");
                return url_read_error(url);
            }
        };

        let status = response.status().as_u16();
        if status >= 400 {
            tracing::warn!(url, status, "url returned error status");
            return url_read_error(url);
        }

        match response.into_body().read_to_string() {
            Ok(body) if !body.is_empty() => body,
            Ok(_) => url_read_error(url),
            Err(e) => {
                tracing::warn!(url, error = %e, "failed to read url body");
                url_read_error(url)
            }
        }
    }
}
