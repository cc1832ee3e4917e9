//! GitHub HTTP request methods

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{GithubError, Result};
use crate::http_client::{HttpResponse, HttpUtils, retry_idempotent, retry_rate_limited_only};
use crate::traits::{ErrorContext, GithubErrorMapper, RawApiError};
use crate::utils::log_sanitizer::truncate_for_log;

use super::{GITHUB_ACCEPT, GITHUB_API_VERSION, GithubClient};

/// Error body shape shared by all GitHub endpoints.
#[derive(serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl GithubClient {
    fn build(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.options.base_url.trim_end_matches('/'));
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }

    /// Sends a request. POST is retried only on rate limits; other methods on any
    /// transient failure.
    pub(crate) async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpResponse>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.build(method.clone(), path);
        if let Some(body) = body {
            let payload =
                serde_json::to_string(body).map_err(|e| GithubError::SerializationError {
                    detail: e.to_string(),
                })?;
            request = request.header(CONTENT_TYPE, "application/json").body(payload);
        }

        let should_retry: fn(&GithubError) -> bool = if method == Method::POST {
            retry_rate_limited_only
        } else {
            retry_idempotent
        };

        HttpUtils::execute_request_with_retry(
            request,
            method.as_str(),
            path,
            &self.options.retry,
            should_retry,
        )
        .await
    }

    /// Turns a non-2xx response into a mapped error.
    pub(crate) fn check(&self, response: &HttpResponse, ctx: ErrorContext) -> Result<()> {
        if response.is_success() {
            return Ok(());
        }
        let message = error_message(&response.body);
        log::debug!("API error (HTTP {}): {message}", response.status);
        Err(self.map_error(RawApiError::new(response.status, message), ctx))
    }

    /// Send, check, parse.
    pub(crate) async fn request_json<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        ctx: ErrorContext,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(method, path, body).await?;
        self.check(&response, ctx)?;
        HttpUtils::parse_json(&response.body)
    }

    /// Send and check; the response is returned for status inspection.
    pub(crate) async fn request_unit<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        ctx: ErrorContext,
    ) -> Result<HttpResponse>
    where
        B: Serialize + ?Sized,
    {
        let response = self.send(method, path, body).await?;
        self.check(&response, ctx)?;
        Ok(response)
    }

    /// Execute a GET request
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str, ctx: ErrorContext) -> Result<T> {
        self.request_json::<T, ()>(Method::GET, path, None, ctx).await
    }

    /// GET that treats 404 as `None`.
    pub(crate) async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        ctx: ErrorContext,
    ) -> Result<Option<T>> {
        let response = self.send::<()>(Method::GET, path, None).await?;
        if response.status == 404 {
            return Ok(None);
        }
        self.check(&response, ctx)?;
        HttpUtils::parse_json(&response.body).map(Some)
    }
}

/// `message` of a GitHub error body, or the truncated raw body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| truncate_for_log(body))
}
