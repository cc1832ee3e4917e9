//! GitHub error mapping

use crate::error::GithubError;
use crate::traits::{ErrorContext, GithubErrorMapper, RawApiError};

use super::GithubClient;

/// GitHub status code mapping
/// Reference: <https://docs.github.com/en/rest/using-the-rest-api/troubleshooting-the-rest-api>
///
/// Rate limits (429, exhausted 403) and gateway errors are classified earlier in
/// `HttpUtils::execute_request` and never reach this mapper.
impl GithubErrorMapper for GithubClient {
    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> GithubError {
        match raw.status {
            // 401: Bad credentials / token expired
            401 if raw.message.to_ascii_lowercase().contains("expired") => {
                GithubError::TokenExpired {
                    raw_message: Some(raw.message),
                }
            }
            401 => GithubError::InvalidCredentials {
                raw_message: Some(raw.message),
            },

            // 403: Resource not accessible by personal access token / missing scope
            403 => GithubError::PermissionDenied {
                raw_message: Some(raw.message),
            },

            // 404: missing, or hidden from this token. 410: disabled feature (e.g. Actions)
            404 | 410 => GithubError::NotFound {
                resource: context
                    .resource
                    .unwrap_or_else(|| "<unknown>".to_string()),
                raw_message: Some(raw.message),
            },

            // 409: conflict. 422: validation failed / unprocessable
            409 | 422 => GithubError::ValidationFailed {
                raw_message: raw.message,
            },

            _ => self.unknown_error(raw),
        }
    }
}
