//! Process-wide HTTP client for the catalog scrapers.

use std::sync::Once;
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::Version;
use scraper::Html;

use crate::error::{Result, ScrapeError};

const USER_AGENT: &str = concat!("catalog-search/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

static HTTP_VERSION_WARNING: Once = Once::new();

/// Shared `reqwest` wrapper. Configured once at startup and cloned freely;
/// clones share the same connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    warn_about_http_version: bool,
}

impl Client {
    pub fn new(warn_about_http_version: bool) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::limited(5))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, warn_about_http_version })
    }

    /// GET a page body as text. Non-2xx responses are errors.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.http.get(url).send().await?;
        if self.warn_about_http_version
            && !matches!(response.version(), Version::HTTP_09 | Version::HTTP_10 | Version::HTTP_11)
        {
            // Several catalog hosts serve broken responses outside HTTP/1.
            HTTP_VERSION_WARNING.call_once(|| {
                tracing::warn!(
                    version = ?response.version(),
                    "server negotiated a non-HTTP/1 version, scrapes may misbehave"
                );
            });
        }
        if !response.status().is_success() {
            return Err(ScrapeError::Status { status: response.status(), url: url.to_string() });
        }
        Ok(response.text().await?)
    }

    /// Fetch a page and hand the parsed document to `extract`.
    ///
    /// The document is parsed and consumed inside this call because `Html` is
    /// not `Send`; callers extract owned data and never hold the DOM across
    /// an await.
    pub async fn fetch_html<T, F>(&self, url: &str, extract: F) -> Result<T>
    where
        F: FnOnce(&Html) -> Result<T>,
    {
        let body = self.get_text(url).await?;
        extract(&Html::parse_document(&body))
    }
}
