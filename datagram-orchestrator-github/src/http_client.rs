//! Generic HTTP execution and retry
//!
//! `HttpUtils` sends one request and turns transport failures, rate limits and gateway
//! errors into [`GithubError`]s. [`RetryPolicy`] wraps any fallible async call in a
//! bounded retry loop with exponential backoff.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use reqwest::RequestBuilder;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::error::{GithubError, Result};
use crate::utils::log_sanitizer::truncate_for_log;

/// Upper bound on the exponent used by [`RetryPolicy::backoff_delay`].
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Status, selected headers and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub(crate) struct HttpResponse {
    pub status: u16,
    /// Value of `x-oauth-scopes` (classic tokens only).
    pub oauth_scopes: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Bounded retry with exponential backoff.
///
/// Attempt `n` (0-based) waits `base_delay * 2^n`, capped at `max_delay`. A rate-limit
/// response carrying a retry-after hint waits for that hint instead, also capped at
/// `max_delay`. The loop never runs more than `max_attempts` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Values below 1 behave as 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries `max_attempts` times without sleeping. Intended for tests.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self::immediate(1)
    }

    /// Exponential backoff for the given 0-based attempt.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1_u32 << attempt.min(MAX_BACKOFF_EXPONENT);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Delay before retrying after `error` on the given 0-based attempt.
    #[must_use]
    pub fn retry_delay(&self, error: &GithubError, attempt: u32) -> Duration {
        if let GithubError::RateLimited {
            retry_after: Some(secs),
            ..
        } = error
        {
            Duration::from_secs(*secs).min(self.max_delay)
        } else {
            self.backoff_delay(attempt)
        }
    }

    /// Runs `op` until it succeeds, fails with an error `should_retry` rejects, or the
    /// attempt ceiling is reached. The last error is returned in the latter two cases.
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        should_retry: impl Fn(&GithubError) -> bool,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 < max_attempts && should_retry(&e) => {
                    let delay = self.retry_delay(&e, attempt);
                    log::warn!(
                        "{label} failed (attempt {}/{max_attempts}), retrying in {:.1}s: {e}",
                        attempt + 1,
                        delay.as_secs_f32(),
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Retry predicate for idempotent calls (GET, PUT, PATCH, DELETE).
pub(crate) fn retry_idempotent(error: &GithubError) -> bool {
    error.is_retryable()
}

/// Retry predicate for non-idempotent calls (POST).
///
/// A rate-limit response means the request was refused before any side effect, so it is
/// safe to repeat. A transport failure is ambiguous and is handed back to the caller.
pub(crate) fn retry_rate_limited_only(error: &GithubError) -> bool {
    matches!(error, GithubError::RateLimited { .. })
}

/// HTTP tool function set
pub(crate) struct HttpUtils;

impl HttpUtils {
    /// Performs an HTTP request and returns the response.
    ///
    /// Rate limits (429, or 403 with an exhausted quota) become [`GithubError::RateLimited`];
    /// 500 and 502-504 become [`GithubError::NetworkError`]. Other statuses are returned
    /// as-is for the caller to map.
    pub async fn execute_request(
        request_builder: RequestBuilder,
        method_name: &str,
        url: &str,
    ) -> Result<HttpResponse> {
        log::debug!("{method_name} {url}");

        let response = request_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GithubError::Timeout {
                    detail: e.to_string(),
                }
            } else {
                GithubError::NetworkError {
                    detail: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        log::debug!("Response Status: {status}");

        let headers = response.headers().clone();
        let oauth_scopes = header_str(&headers, "x-oauth-scopes").map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| GithubError::NetworkError {
                detail: format!("Failed to read response body: {e}"),
            })?;

        if is_rate_limited(status, &headers, &body) {
            let retry_after = retry_after_secs(&headers);
            log::warn!("Rate limited (HTTP {status}), retry_after={retry_after:?}");
            return Err(GithubError::RateLimited {
                retry_after,
                raw_message: Some(truncate_for_log(&body)),
            });
        }

        if matches!(status, 500 | 502..=504) {
            log::warn!("Server error (HTTP {status})");
            return Err(GithubError::NetworkError {
                detail: format!("HTTP {status}: {}", truncate_for_log(&body)),
            });
        }

        log::debug!("Response Body: {}", truncate_for_log(&body));

        Ok(HttpResponse {
            status,
            oauth_scopes,
            body,
        })
    }

    /// Parse JSON response
    pub fn parse_json<T>(response_text: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(response_text).map_err(|e| {
            log::error!("JSON parse failed: {e}");
            log::error!("Raw response: {}", truncate_for_log(response_text));
            GithubError::ParseError {
                detail: e.to_string(),
            }
        })
    }

    /// Performs an HTTP request under `policy`, retrying only errors `should_retry` accepts.
    pub async fn execute_request_with_retry(
        request_builder: RequestBuilder,
        method_name: &str,
        url: &str,
        policy: &RetryPolicy,
        should_retry: fn(&GithubError) -> bool,
    ) -> Result<HttpResponse> {
        // Bodies built from bytes/strings are always clonable; fall back to a single attempt otherwise.
        if request_builder.try_clone().is_none() {
            log::warn!("Cannot clone request, disabling retry");
            return Self::execute_request(request_builder, method_name, url).await;
        }

        let label = format!("{method_name} {url}");
        policy
            .run(&label, should_retry, || {
                let attempt = request_builder.try_clone();
                async move {
                    let req = attempt.ok_or_else(|| GithubError::Unknown {
                        status: None,
                        raw_message: "request became unclonable".to_string(),
                    })?;
                    Self::execute_request(req, method_name, url).await
                }
            })
            .await
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn is_rate_limited(status: u16, headers: &HeaderMap, body: &str) -> bool {
    match status {
        429 => true,
        403 => {
            header_str(headers, "x-ratelimit-remaining") == Some("0")
                || body.to_ascii_lowercase().contains("rate limit")
        }
        _ => false,
    }
}

/// Seconds to wait, from `Retry-After` or the primary limit's `x-ratelimit-reset` epoch.
fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    if let Some(secs) = header_str(headers, "retry-after").and_then(|v| v.parse::<u64>().ok()) {
        return Some(secs);
    }
    let reset = header_str(headers, "x-ratelimit-reset")?
        .parse::<i64>()
        .ok()?;
    u64::try_from(reset - Utc::now().timestamp()).ok()
}
