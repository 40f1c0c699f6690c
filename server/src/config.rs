//! Process configuration, built once from the CLI and never mutated.

use std::path::PathBuf;

use clap::ValueEnum;

use scraping::{CacheConfig, Client, ScrapeEnv};
use search::{SearchOptions, MAX_RESULT_SCORE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    Development,
    Production,
    Testing,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub profile: Profile,
    /// Include the `score` key in search results.
    pub send_score: bool,
    /// Include hidden properties in search results.
    pub send_hidden_fields: bool,
    pub max_result_score: f64,
    pub default_search_limit: u32,
    pub max_search_limit: u32,
    pub warn_about_http_version: bool,
    pub cache_directory: String,
    pub use_caching: bool,
    pub resources_dir: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn new(profile: Profile, resources_dir: PathBuf, port: u16) -> Self {
        let mut config = Self {
            profile,
            send_score: false,
            send_hidden_fields: false,
            max_result_score: MAX_RESULT_SCORE,
            default_search_limit: 25,
            max_search_limit: 100,
            warn_about_http_version: true,
            cache_directory: "Cache".to_string(),
            use_caching: true,
            resources_dir,
            host: "127.0.0.1".to_string(),
            port,
        };
        match profile {
            Profile::Development => {
                config.send_score = true;
                config.send_hidden_fields = true;
            }
            Profile::Production => {
                config.host = "0.0.0.0".to_string();
            }
            Profile::Testing => {
                config.use_caching = false;
            }
        }
        config
    }

    /// Development responses are pretty-printed with sorted keys.
    pub fn pretty_json(&self) -> bool {
        self.profile == Profile::Development
    }

    pub fn compress_responses(&self) -> bool {
        self.profile == Profile::Production
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            cutoff: self.max_result_score,
            send_score: self.send_score,
            send_hidden_fields: self.send_hidden_fields,
        }
    }

    pub fn scrape_env(&self) -> anyhow::Result<ScrapeEnv> {
        Ok(ScrapeEnv {
            client: Client::new(self.warn_about_http_version)?,
            cache: CacheConfig {
                resources_dir: self.resources_dir.clone(),
                cache_directory: self.cache_directory.clone(),
                use_caching: self.use_caching,
            },
        })
    }

    pub fn public_index(&self) -> PathBuf {
        self.resources_dir.join("Public").join("index.html")
    }
}
