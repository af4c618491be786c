use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider API error ({status}): {body}")]
    Api { status: StatusCode, body: String },
    #[error("failed to parse provider response: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("idea store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("idea store json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("idea store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("idea store rejected request ({status}): {body}")]
    Remote { status: StatusCode, body: String },
    #[error("idea store lock error")]
    Lock,
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("no provider credentials configured; set GEMINI_API_KEY or GEMINI_API_KEY_<n>")]
    Configuration,
    #[error("failed to generate idea after {attempts} attempts")]
    Exhausted { attempts: usize },
    #[error("failed to persist idea: {0}")]
    Store(#[from] StoreError),
}
