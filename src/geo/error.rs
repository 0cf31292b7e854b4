use thiserror::Error;

/// Failure of a single lookup. Never fatal to a batch.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("geocoder answered HTTP {0}")]
    Status(u16),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid coordinate {0:?}")]
    BadCoordinate(String),
}
