use crate::error::*;
use std::time::Duration;
use tracing::{error, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        if let CoreError::Api(e) = self {
            error!("Moltbook API error details: {:?}", e);
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::Api(e) => e.is_retryable(),
            CoreError::Dispatch(e) => e.is_retryable(),
            CoreError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::Api(e) => e.retry_after(),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Api(e) => e.user_friendly_message(),
            CoreError::Dispatch(e) => e.user_friendly_message(),
            CoreError::Credentials(CredentialsError::ConfigDirUnavailable) => {
                "Could not locate a configuration directory on this system.".to_string()
            }
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::InvalidInput { message } => message.clone(),
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Api(e) => e.error_code(),
            CoreError::Credentials(_) => "CREDENTIALS".to_string(),
            CoreError::Dispatch(e) => e.error_code(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for ApiError {
    fn log_error(&self) -> &Self {
        error!("ApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ApiError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            ApiError::RateLimitExceeded { .. } => true,
            ApiError::RequestTimeout => true,
            ApiError::RequestFailed { status, .. } => *status >= 500,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimitExceeded { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ApiError::MissingApiKey => {
                "No API key configured. Paste your Moltbook API key and connect first.".to_string()
            }
            ApiError::DisallowedUrl { .. } | ApiError::DisallowedHost { .. } => {
                "Refused to send credentials outside www.moltbook.com.".to_string()
            }
            ApiError::RateLimitExceeded { hint: Some(hint), .. } => {
                format!("Too many requests ({}). Please wait before trying again.", hint)
            }
            ApiError::RateLimitExceeded { hint: None, .. } => {
                "Too many requests. Please wait before trying again.".to_string()
            }
            ApiError::RequestFailed { message, .. } => message.clone(),
            ApiError::RequestTimeout => {
                "Request to Moltbook timed out. Please try again.".to_string()
            }
            ApiError::UnexpectedShape { .. } => self.to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ApiError::MissingApiKey => "API_KEY_MISSING".to_string(),
            ApiError::DisallowedUrl { .. } => "URL_NOT_ALLOWED".to_string(),
            ApiError::DisallowedHost { .. } => "HOST_NOT_ALLOWED".to_string(),
            ApiError::RateLimitExceeded { .. } => "RATE_LIMITED".to_string(),
            ApiError::RequestFailed { .. } => "REQUEST_FAILED".to_string(),
            ApiError::RequestTimeout => "TIMEOUT".to_string(),
            ApiError::UnexpectedShape { .. } => "UNEXPECTED_RESPONSE".to_string(),
        }
    }
}

impl ErrorExt for DispatchError {
    fn log_error(&self) -> &Self {
        error!("DispatchError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("DispatchError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::QueueFull { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            DispatchError::QueueFull { .. } => {
                "Too many actions are already queued. Wait for the current work to finish."
                    .to_string()
            }
            DispatchError::Closed => "The action queue is shutting down.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            DispatchError::QueueFull { .. } => "QUEUE_FULL".to_string(),
            DispatchError::Closed => "DISPATCH_CLOSED".to_string(),
        }
    }
}
