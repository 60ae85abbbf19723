use thiserror::Error;

pub type Result<T> = std::result::Result<T, TedClientError>;

#[derive(Debug, Error)]
pub enum TedClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TedClientError {
    fn from(err: reqwest::Error) -> Self {
        TedClientError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for TedClientError {
    fn from(err: serde_json::Error) -> Self {
        TedClientError::Decode(err.to_string())
    }
}
