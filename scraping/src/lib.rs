pub mod client;
pub mod courses;
pub mod disciplines;
pub mod error;
pub mod html;
pub mod models;
pub mod store;

pub use client::Client;
pub use error::ScrapeError;
pub use store::{fetch, CacheConfig, ScrapeEnv, Scraper};
