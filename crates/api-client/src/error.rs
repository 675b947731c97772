use crate::safety::sanitize_reqwest_error;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("config error: {0}")]
    Config(String),
    /// The API answered with a non-2xx status. `body` is the decoded response body.
    #[error("Khipu API error {status}: {body}")]
    Api { status: u16, body: Value },
    #[error("http transport error: {0}")]
    Transport(String),
    #[error("response too large: {0}")]
    TooLarge(String),
}

pub type Result<T> = std::result::Result<T, ApiClientError>;

impl From<reqwest::Error> for ApiClientError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(sanitize_reqwest_error(&value))
    }
}
