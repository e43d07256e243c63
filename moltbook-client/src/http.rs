use crate::envelope::pretty_json;
use crate::rate_limit::{rate_limit_hint, retry_after_header};
use crate::retry::{decide_retry, retryable_method, run_with_retry, RetryConfig};
use crate::transcript::{self, DebugHook};
use moltbook_core::{ApiError, CoreError};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

pub const API_BASE: &str = "https://www.moltbook.com/api/v1"; // MUST be www
pub const ALLOWED_HOST: &str = "www.moltbook.com";

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(8);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Guards every outgoing URL. The bearer token is only ever presented to
/// the fixed production origin; lookalike hosts, other paths on the same
/// host and other schemes are all refused before anything is sent.
pub fn ensure_allowed_url(url: &str) -> Result<(), CoreError> {
    let within_base = url
        .strip_prefix(API_BASE)
        .map_or(false, |rest| rest.is_empty() || rest.starts_with('/'));
    if !within_base {
        return Err(ApiError::DisallowedUrl {
            url: url.to_string(),
        }
        .into());
    }

    let parsed = Url::parse(url).map_err(|_| ApiError::DisallowedUrl {
        url: url.to_string(),
    })?;
    let host = parsed.host_str().unwrap_or_default();
    if host != ALLOWED_HOST {
        return Err(ApiError::DisallowedHost {
            host: host.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Connection settings for a Moltbook client. The API key is fixed at
/// construction; connecting as a different agent means building a new
/// client rather than mutating a shared one.
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into().trim().to_string(),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            user_agent: format!("moltbook-desktop/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            retry: RetryConfig::default(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field(
                "api_key",
                &transcript::redact_authorization(&self.api_key),
            )
            .field("user_agent", &self.user_agent)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

/// An upload read fully into memory, so the request can be rebuilt for
/// every retry attempt.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FilePayload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub async fn read(path: &Path) -> Result<Self, CoreError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        Ok(Self { file_name, bytes })
    }
}

/// Per-call request options: query params, an optional JSON body, and an
/// optional multipart upload with extra form fields.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub params: Vec<(String, String)>,
    pub json_body: Option<Value>,
    pub file: Option<FilePayload>,
    pub form_fields: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.json_body = Some(body);
        self
    }

    pub fn with_file(mut self, file: FilePayload) -> Self {
        self.file = Some(file);
        self
    }

    pub fn with_form_field(mut self, key: &str, value: &str) -> Self {
        self.form_fields.push((key.to_string(), value.to_string()));
        self
    }

    // A JSON content type is only declared when the body actually is
    // JSON; multipart uploads carry their own content type.
    fn sends_json(&self) -> bool {
        self.json_body.is_some() && self.file.is_none()
    }
}

/// Final outcome of one API call after retries: the status plus the
/// parsed (or synthesized) JSON body. Non-success statuses are returned
/// here rather than raised, so callers decide which statuses they accept.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
    pub text: String,
    pub retry_after: Option<Duration>,
    pub rate_limit_hint: Option<String>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The server's `error` field when present, else the whole body
    /// pretty-printed so nothing is hidden from the user.
    pub fn error_message(&self) -> String {
        match self.body.get("error").and_then(Value::as_str) {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => pretty_json(&self.body),
        }
    }

    /// Accepts the listed statuses and unwraps the body, converting
    /// anything else into a typed error.
    pub fn into_result(self, expected: &[u16]) -> Result<Value, CoreError> {
        if expected.contains(&self.status) {
            return Ok(self.body);
        }
        if self.status == 429 {
            return Err(ApiError::RateLimitExceeded {
                retry_after: self.retry_after,
                hint: self.rate_limit_hint,
            }
            .into());
        }
        let message = self.error_message();
        Err(ApiError::RequestFailed {
            status: self.status,
            message,
        }
        .into())
    }
}

/// Parses a response body as JSON. Non-JSON bodies (gateway errors, HTML
/// splash pages) become a synthetic failure object carrying the raw text.
pub(crate) fn parse_body(status: u16, text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| {
        json!({
            "success": false,
            "error": format!("Non-JSON response (HTTP {})", status),
            "text": text,
        })
    })
}

/// HTTP client for the Moltbook REST API.
pub struct MoltbookClient {
    pub(crate) http: Client,
    pub(crate) config: ClientConfig,
    debug_hook: Option<DebugHook>,
}

impl MoltbookClient {
    pub fn new(config: ClientConfig) -> Self {
        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            config,
            debug_hook: None,
        }
    }

    /// Attaches a transcript hook that receives one line per protocol
    /// event. Purely observational; request handling is unaffected.
    pub fn with_debug_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.debug_hook = Some(Arc::new(hook));
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Performs one API call with retries and returns the final response
    /// whatever its status. Public so unusual or undocumented endpoints
    /// can be probed without a dedicated wrapper. Only GET, POST, PATCH
    /// and DELETE are retried; any other method gets a single attempt.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse, CoreError> {
        let url = format!("{}{}", API_BASE, path);
        ensure_allowed_url(&url)?;
        if self.config.api_key.is_empty() {
            return Err(ApiError::MissingApiKey.into());
        }

        if self.debug_hook.is_some() {
            self.emit(format!("REQUEST {} {}", method, url));
            self.emit(format!(
                "HEADERS {}",
                transcript::describe_headers(&self.config.api_key, options.sends_json())
            ));
            if !options.params.is_empty() {
                self.emit(format!("PARAMS {:?}", options.params));
            }
            if let Some(body) = &options.json_body {
                self.emit(format!("JSON_BODY keys={:?}", transcript::json_keys(body)));
            }
        }

        debug!("Moltbook API request: {} {}", method, path);

        let operation = format!("{} {}", method, path);
        let result = if retryable_method(&method) {
            run_with_retry(
                &self.config.retry,
                &operation,
                || self.send_once(&method, &url, &options),
                decide_retry,
            )
            .await
        } else {
            self.send_once(&method, &url, &options).await
        };

        if self.debug_hook.is_some() {
            if let Ok(response) = &result {
                self.emit(format!("RESPONSE HTTP {}", response.status));
                if response.status >= 400 {
                    self.emit(format!(
                        "RESPONSE BODY {}",
                        transcript::preview(
                            &response.text,
                            transcript::ERROR_BODY_PREVIEW_CHARS
                        )
                    ));
                }
            }
        }

        result
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<ApiResponse, CoreError> {
        let mut request = self
            .http
            .request(method.clone(), url)
            .bearer_auth(&self.config.api_key);

        if !options.params.is_empty() {
            request = request.query(&options.params);
        }

        request = match (&options.json_body, &options.file) {
            (_, Some(file)) => {
                let mut form = Form::new().part(
                    "file",
                    Part::bytes(file.bytes.clone()).file_name(file.file_name.clone()),
                );
                for (key, value) in &options.form_fields {
                    form = form.text(key.clone(), value.clone());
                }
                request.multipart(form)
            }
            (Some(body), None) => request.json(body),
            (None, None) => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| network_error(method, url, e))?;

        let status = response.status().as_u16();
        let retry_after = retry_after_header(response.headers());
        let text = response
            .text()
            .await
            .map_err(|e| network_error(method, url, e))?;

        let body = parse_body(status, &text);
        let rate_limit_hint = if status == 429 {
            rate_limit_hint(&body)
        } else {
            None
        };

        Ok(ApiResponse {
            status,
            body,
            text,
            retry_after,
            rate_limit_hint,
        })
    }

    fn emit(&self, line: String) {
        if let Some(hook) = &self.debug_hook {
            hook(&line);
        }
    }
}

impl fmt::Debug for MoltbookClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoltbookClient")
            .field("config", &self.config)
            .field("debug_hook", &self.debug_hook.is_some())
            .finish()
    }
}

fn network_error(method: &Method, url: &str, error: reqwest::Error) -> CoreError {
    error!("Network error for {} {}: {}", method, url, error);
    if error.is_timeout() {
        ApiError::RequestTimeout.into()
    } else {
        CoreError::Network(error)
    }
}
