//! Error types shared by the store and the sync driver

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("draw {draw}: expected {expected} slots, scraped {actual}")]
    SlotCount {
        draw: String,
        expected: usize,
        actual: usize,
    },

    #[error("no persisted slot for {0}, cannot attach set")]
    MissingSlot(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
