use thiserror::Error;

use crate::html::ParsingError;

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: reqwest::StatusCode, url: String },

    #[error(transparent)]
    Parsing(#[from] ParsingError),

    #[error("cache io: {0}")]
    CacheIo(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
