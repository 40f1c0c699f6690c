//! Scraper contract and the cache-or-scrape runner.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use search::normalize::sanitise_path_segment;
use search::schema::short_type_name;

use crate::client::Client;
use crate::error::Result;

/// Where scraped artifacts live on disk.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub resources_dir: PathBuf,
    /// Directory name under `resources_dir`; sanitized before use.
    pub cache_directory: String,
    pub use_caching: bool,
}

impl CacheConfig {
    pub fn cache_dir(&self) -> PathBuf {
        self.resources_dir.join(sanitise_path_segment(&self.cache_directory))
    }

    pub fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir().join(format!("{key}.json"))
    }
}

/// Everything a scraper plugin gets to work with.
#[derive(Clone)]
pub struct ScrapeEnv {
    pub client: Client,
    pub cache: CacheConfig,
}

/// A scraper plugin for one record type.
///
/// The output is any JSON value; for corpora it is a `Vec` of records, but a
/// plugin may emit a richer map if its consumers want one.
#[async_trait]
pub trait Scraper: Send + Sync + 'static {
    type Output: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// File stem of the cache artifact.
    fn cache_key() -> String
    where
        Self: Sized,
    {
        sanitise_path_segment(short_type_name::<Self>())
    }

    /// Produce a fully decoded output from the live site.
    async fn scrape(env: &ScrapeEnv) -> Result<Self::Output>;
}

/// Obtain a scraper's output, preferring the on-disk cache.
///
/// Cache hits skip the network entirely. On a miss (or an unreadable or
/// stale artifact) the plugin scrapes; a fresh result is written back by a
/// detached task so the caller is not blocked on disk I/O. A scrape failure
/// is retried exactly once with the cache file removed first; the second
/// failure surfaces.
pub async fn fetch<S: Scraper>(env: &ScrapeEnv) -> Result<S::Output> {
    let path = env.cache.cache_path(&S::cache_key());

    if env.cache.use_caching {
        match read_cached::<S::Output>(&path).await {
            Ok(output) => {
                tracing::debug!(cache = %path.display(), "loaded scrape output from cache");
                return Ok(output);
            }
            Err(error) => {
                tracing::debug!(cache = %path.display(), %error, "cache unusable, scraping");
            }
        }
    }

    match S::scrape(env).await {
        Ok(output) => {
            if env.cache.use_caching {
                write_back(path, &output);
            }
            Ok(output)
        }
        Err(error) => {
            tracing::warn!(%error, "scrape failed, retrying with cache invalidated");
            let _ = tokio::fs::remove_file(&path).await;
            S::scrape(env).await
        }
    }
}

/// Scrape fresh output and persist it before returning, ignoring any cached
/// artifact. Used by the cache-building command, where the write is the
/// whole point.
pub async fn refresh<S: Scraper>(env: &ScrapeEnv) -> Result<()> {
    let output = S::scrape(env).await?;
    let payload = serde_json::to_vec_pretty(&output)?;
    let path = env.cache.cache_path(&S::cache_key());
    persist(&path, &payload).await?;
    tracing::info!(cache = %path.display(), "scrape cache written");
    Ok(())
}

async fn read_cached<O: DeserializeOwned>(path: &PathBuf) -> Result<O> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Serialize now, write later: the JSON is rendered before the task detaches
/// so the caller's value can be returned without cloning.
fn write_back<O: Serialize>(path: PathBuf, output: &O) {
    let payload = match serde_json::to_vec_pretty(output) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::error!(%error, "scrape output is not encodable, cache not written");
            return;
        }
    };
    tokio::spawn(async move {
        if let Err(error) = persist(&path, &payload).await {
            tracing::error!(cache = %path.display(), %error, "failed to write scrape cache");
        }
    });
}

async fn persist(path: &PathBuf, payload: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
        Err(error) => return Err(error),
    }
    tokio::fs::write(path, payload).await
}
