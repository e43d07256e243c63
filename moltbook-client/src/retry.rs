use crate::http::ApiResponse;
use moltbook_core::{CoreError, ErrorExt};
use reqwest::Method;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Response statuses that are worth another attempt.
pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Statuses whose Retry-After header is taken at face value. Other
/// retryable statuses stay on the capped backoff schedule even when a
/// server sends the header.
pub const RETRY_AFTER_STATUSES: [u16; 2] = [429, 503];

/// Methods eligible for retries at all; anything else gets a single
/// attempt.
pub const RETRY_METHODS: [Method; 4] =
    [Method::GET, Method::POST, Method::PATCH, Method::DELETE];

pub fn retryable_status(status: u16) -> bool {
    RETRY_STATUSES.contains(&status)
}

pub fn retryable_method(method: &Method) -> bool {
    RETRY_METHODS.contains(method)
}

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Maximum jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 800,  // Matches the API's suggested pacing
            max_delay_ms: 60000, // Max 1 minute delay
            backoff_multiplier: 2.0,
            jitter_factor: 0.1, // 10% jitter to prevent thundering herd
        }
    }
}

/// What to do with the outcome of one attempt
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Result is final, hand it back to the caller
    Accept,
    /// Retry with exponential backoff
    Retry,
    /// Retry after a server-specified delay
    RetryWithDelay(Duration),
    /// Don't retry (permanent failure)
    NoRetry,
}

/// Decide how to treat one attempt against the Moltbook API.
///
/// A response with a retryable status is retried but never turned into
/// an error here; once the budget runs out the final response is handed
/// back as-is so callers can inspect its status and body. A Retry-After
/// delay steers 429 and 503 only and is ignored elsewhere.
pub fn decide_retry(result: &Result<ApiResponse, CoreError>) -> RetryDecision {
    match result {
        Ok(response) if retryable_status(response.status) => match response.retry_after {
            Some(delay) if RETRY_AFTER_STATUSES.contains(&response.status) => {
                RetryDecision::RetryWithDelay(delay)
            }
            _ => RetryDecision::Retry,
        },
        Ok(_) => RetryDecision::Accept,
        Err(error) if error.is_retryable() => RetryDecision::Retry,
        Err(_) => RetryDecision::NoRetry,
    }
}

/// Calculate delay with exponential backoff and jitter
pub fn calculate_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let base_delay = Duration::from_millis(config.base_delay_ms);
    let max_delay = Duration::from_millis(config.max_delay_ms);

    let exponential_delay = if attempt == 0 {
        base_delay
    } else {
        let multiplier = config.backoff_multiplier.powi(attempt as i32);
        let delay_ms = (config.base_delay_ms as f64 * multiplier) as u64;
        Duration::from_millis(delay_ms.min(config.max_delay_ms))
    };

    // Add jitter to prevent thundering herd
    let jitter_range = (exponential_delay.as_millis() as f64 * config.jitter_factor) as u64;
    let jitter = fastrand::u64(0..=jitter_range);
    let final_delay = exponential_delay + Duration::from_millis(jitter);

    final_delay.min(max_delay)
}

/// Drives one operation through the retry budget.
///
/// `operation` produces a fresh attempt each call; `decide` judges the
/// attempt's outcome. When the budget is exhausted the result of the
/// last attempt is returned, success or not.
pub async fn run_with_retry<T, F, Fut, D>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    decide: D,
) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
    D: Fn(&Result<T, CoreError>) -> RetryDecision,
{
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            debug!("Retry attempt {} for {}", attempt, operation_name);
        }

        let result = operation().await;

        let delay = match decide(&result) {
            RetryDecision::Accept => return result,
            RetryDecision::NoRetry => {
                if let Err(error) = &result {
                    debug!(
                        "Not retrying {} due to error type: {}",
                        operation_name, error
                    );
                }
                return result;
            }
            RetryDecision::Retry => calculate_delay(attempt, config),
            RetryDecision::RetryWithDelay(delay) => delay,
        };

        if attempt >= config.max_retries {
            warn!(
                "Retry budget exhausted for {} after {} attempts",
                operation_name,
                attempt + 1
            );
            return result;
        }

        match &result {
            Err(error) => info!("Retrying {} in {:?} due to: {}", operation_name, delay, error),
            Ok(_) => info!(
                "Retrying {} in {:?} after retryable status",
                operation_name, delay
            ),
        }

        sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moltbook_core::ApiError;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn response(status: u16) -> ApiResponse {
        ApiResponse {
            status,
            body: json!({}),
            text: String::new(),
            retry_after: None,
            rate_limit_hint: None,
        }
    }

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_retries: 5,
            base_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("moltbook_client=debug")
            .try_init();
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.base_delay_ms, 800);
        assert_eq!(config.max_delay_ms, 60000);
        assert!(config.jitter_factor <= 1.0);
    }

    #[test]
    fn test_retryable_status_matrix() {
        for status in RETRY_STATUSES {
            assert!(retryable_status(status), "{} should retry", status);
        }
        for status in [200u16, 201, 400, 401, 403, 404, 405] {
            assert!(!retryable_status(status), "{} should not retry", status);
        }
    }

    #[test]
    fn test_exponential_backoff_calculation() {
        let config = RetryConfig {
            max_retries: 5,
            base_delay_ms: 800,
            max_delay_ms: 10000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.0, // No jitter for predictable test
        };

        assert_eq!(calculate_delay(0, &config), Duration::from_millis(800));
        assert_eq!(calculate_delay(1, &config), Duration::from_millis(1600));
        assert_eq!(calculate_delay(2, &config), Duration::from_millis(3200));
        assert_eq!(calculate_delay(3, &config), Duration::from_millis(6400));

        // Should cap at max_delay_ms
        assert_eq!(calculate_delay(10, &config), Duration::from_millis(10000));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let config = RetryConfig {
            max_retries: 5,
            base_delay_ms: 1000,
            max_delay_ms: 10000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.5,
        };

        for _ in 0..20 {
            let delay = calculate_delay(1, &config);
            assert!(delay >= Duration::from_millis(2000));
            assert!(delay <= Duration::from_millis(3000)); // base 2000 + 50% jitter
        }
    }

    #[test]
    fn test_decision_for_statuses_and_errors() {
        assert_eq!(decide_retry(&Ok(response(200))), RetryDecision::Accept);
        // Client errors are final responses, not retries
        assert_eq!(decide_retry(&Ok(response(404))), RetryDecision::Accept);
        assert_eq!(decide_retry(&Ok(response(503))), RetryDecision::Retry);

        let mut limited = response(429);
        limited.retry_after = Some(Duration::from_secs(7));
        assert_eq!(
            decide_retry(&Ok(limited)),
            RetryDecision::RetryWithDelay(Duration::from_secs(7))
        );

        let timeout: Result<ApiResponse, CoreError> = Err(ApiError::RequestTimeout.into());
        assert_eq!(decide_retry(&timeout), RetryDecision::Retry);

        let fatal: Result<ApiResponse, CoreError> = Err(ApiError::MissingApiKey.into());
        assert_eq!(decide_retry(&fatal), RetryDecision::NoRetry);
    }

    #[test]
    fn test_retry_after_steers_429_and_503_only() {
        // A 500 carrying a Retry-After header must stay on the capped
        // backoff schedule instead of sleeping the header value.
        let mut broken = response(500);
        broken.retry_after = Some(Duration::from_secs(3600));
        assert_eq!(decide_retry(&Ok(broken)), RetryDecision::Retry);

        let mut unavailable = response(503);
        unavailable.retry_after = Some(Duration::from_secs(2));
        assert_eq!(
            decide_retry(&Ok(unavailable)),
            RetryDecision::RetryWithDelay(Duration::from_secs(2))
        );
    }

    #[test]
    fn test_retryable_method_matrix() {
        for method in RETRY_METHODS {
            assert!(retryable_method(&method), "{} should retry", method);
        }
        for method in [Method::PUT, Method::HEAD, Method::OPTIONS] {
            assert!(!retryable_method(&method), "{} should not retry", method);
        }
    }

    #[tokio::test]
    async fn test_run_with_retry_returns_first_success() {
        let attempts = Arc::new(Mutex::new(0u32));
        let attempts_clone = attempts.clone();

        let result = run_with_retry(
            &fast_config(),
            "GET /agents/me",
            move || {
                let attempts = attempts_clone.clone();
                async move {
                    *attempts.lock().unwrap() += 1;
                    Ok(response(200))
                }
            },
            decide_retry,
        )
        .await;

        assert_eq!(result.unwrap().status, 200);
        assert_eq!(*attempts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_run_with_retry_succeeds_after_server_errors() {
        init_tracing();
        let attempts = Arc::new(Mutex::new(0u32));
        let attempts_clone = attempts.clone();

        let result = run_with_retry(
            &fast_config(),
            "GET /posts",
            move || {
                let attempts = attempts_clone.clone();
                async move {
                    let mut count = attempts.lock().unwrap();
                    *count += 1;
                    if *count <= 3 {
                        Ok(response(503))
                    } else {
                        Ok(response(200))
                    }
                }
            },
            decide_retry,
        )
        .await;

        assert_eq!(result.unwrap().status, 200);
        assert_eq!(*attempts.lock().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_run_with_retry_hands_back_final_failing_response() {
        let config = RetryConfig {
            max_retries: 2,
            ..fast_config()
        };
        let attempts = Arc::new(Mutex::new(0u32));
        let attempts_clone = attempts.clone();

        let result = run_with_retry(
            &config,
            "GET /posts",
            move || {
                let attempts = attempts_clone.clone();
                async move {
                    *attempts.lock().unwrap() += 1;
                    Ok(response(503))
                }
            },
            decide_retry,
        )
        .await;

        // Budget exhausted: the response comes back instead of an error
        assert_eq!(result.unwrap().status, 503);
        assert_eq!(*attempts.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_run_with_retry_stops_on_fatal_error() {
        let attempts = Arc::new(Mutex::new(0u32));
        let attempts_clone = attempts.clone();

        let result: Result<ApiResponse, CoreError> = run_with_retry(
            &fast_config(),
            "GET /agents/me",
            move || {
                let attempts = attempts_clone.clone();
                async move {
                    *attempts.lock().unwrap() += 1;
                    Err(ApiError::MissingApiKey.into())
                }
            },
            decide_retry,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(*attempts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_run_with_retry_honors_server_delay() {
        let attempts = Arc::new(Mutex::new(0u32));
        let attempts_clone = attempts.clone();

        let result = run_with_retry(
            &fast_config(),
            "GET /search",
            move || {
                let attempts = attempts_clone.clone();
                async move {
                    let mut count = attempts.lock().unwrap();
                    *count += 1;
                    if *count == 1 {
                        let mut limited = response(429);
                        limited.retry_after = Some(Duration::ZERO);
                        Ok(limited)
                    } else {
                        Ok(response(200))
                    }
                }
            },
            decide_retry,
        )
        .await;

        assert_eq!(result.unwrap().status, 200);
        assert_eq!(*attempts.lock().unwrap(), 2);
    }
}
