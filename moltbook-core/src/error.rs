use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Moltbook API error: {0}")]
    Api(#[from] ApiError),

    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("API key is not configured")]
    MissingApiKey,

    #[error("Refusing to call non-Moltbook URL: {url}")]
    DisallowedUrl { url: String },

    #[error("Refusing to call disallowed host: {host}")]
    DisallowedHost { host: String },

    #[error("Rate limited (HTTP 429){}", hint_suffix(.hint))]
    RateLimitExceeded {
        retry_after: Option<Duration>,
        hint: Option<String>,
    },

    #[error("Request failed with HTTP {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Could not parse {what} from response:\n{payload}")]
    UnexpectedShape {
        what: &'static str,
        payload: String,
    },
}

#[derive(Error, Debug, Clone)]
pub enum CredentialsError {
    #[error("No user configuration directory available on this system")]
    ConfigDirUnavailable,
}

#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    #[error("Action queue is full ({capacity} actions pending)")]
    QueueFull { capacity: usize },

    #[error("Action queue is shut down")]
    Closed,
}

fn hint_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(hint) => format!(": {}", hint),
        None => String::new(),
    }
}
