//! HTTP helpers shared by registry clients.

use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default connect timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Registry listings never request more than this many pages.
pub const MAX_PAGES: usize = 1000;

/// User agent sent with every registry request.
pub const USER_AGENT: &str = concat!("npm-migrate/", env!("CARGO_PKG_VERSION"));

/// Creates a configured HTTP client with timeouts.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn create_http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()?)
}

/// Describes a non-success HTTP status in one line.
pub fn describe_http_failure(status: StatusCode, body: &str) -> String {
    let hint = match status.as_u16() {
        401 => " (token rejected)",
        403 => " (token lacks read:packages or rate limit exceeded)",
        404 => " (not found or not visible to this token)",
        _ => "",
    };
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {status}{hint}")
    } else {
        format!("HTTP {status}{hint}: {body}")
    }
}

/// Turns a non-success response into a failure description.
pub async fn check_status(response: Response) -> std::result::Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(describe_http_failure(status, &body))
}

/// Strips the scheme and trailing slash from a registry URL, e.g.
/// `https://npm.pkg.github.com/` becomes `npm.pkg.github.com`.
pub fn registry_host_path(url: &str) -> &str {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    without_scheme.trim_end_matches('/')
}

/// Validates that a URL uses an HTTP(S) scheme.
pub fn validate_url(url: &str) -> Result<()> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "invalid URL scheme in '{url}', expected http or https"
        )))
    }
}
