// GitHub API HTTP client.
// Handles authentication, bounded rate-limit retries, and rate limit header tracking.

use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use reqwest::{
    Client, RequestBuilder, Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::Serialize;

use crate::config::{Config, RetryPolicy};
use crate::error::Result;

use super::types::RateLimit;

const GITHUB_API_VERSION: &str = "2022-11-28";
const LOG_TARGET: &str = "ghpulse::http";

/// GitHub API client with authentication and rate limit tracking.
pub struct GitHubClient {
    client: Client,
    api_base: String,
    graphql_url: String,
    retry: RetryPolicy,
    rate_limit: Mutex<RateLimit>,
}

impl GitHubClient {
    /// Create a client from the given configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &config.token {
            let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))?;
            auth.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth);
        }
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("ghpulse"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            graphql_url: config.graphql_url.clone(),
            retry: config.retry.clone(),
            rate_limit: Mutex::new(RateLimit::default()),
        })
    }

    /// Rate limit values from the most recent response.
    pub fn rate_limit(&self) -> RateLimit {
        self.rate_limit
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Make a GET request with query parameters and an optional media type override.
    ///
    /// Rate-limited responses are retried within the configured bound. Once the
    /// bound is exhausted the last response is returned as-is, so callers must
    /// check the status themselves.
    pub async fn request<P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        params: &P,
        accept: Option<&'static str>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.api_base, endpoint);
        log::debug!(target: LOG_TARGET, "GET {}", url);

        self.send_with_retry(|| {
            let builder = self.client.get(&url).query(params);
            match accept {
                Some(media_type) => builder.header(ACCEPT, media_type),
                None => builder,
            }
        })
        .await
    }

    /// Make a GET request without query parameters.
    pub async fn get(&self, endpoint: &str) -> Result<Response> {
        let no_params: [(&str, &str); 0] = [];
        self.request(endpoint, &no_params, None).await
    }

    /// Build a JSON POST to the GraphQL endpoint.
    pub(crate) fn graphql_request(&self, payload: &serde_json::Value) -> RequestBuilder {
        self.client.post(&self.graphql_url).json(payload)
    }

    /// Send a request, sleeping and retrying while the server reports rate limiting.
    pub(crate) async fn send_with_retry<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 1;

        loop {
            let response = build().send().await?;
            self.update_rate_limit(&response);

            if !is_rate_limited(response.status()) {
                return Ok(response);
            }

            if attempt >= max_attempts {
                log::warn!(
                    target: LOG_TARGET,
                    "Max retries ({}) reached for {}",
                    max_attempts,
                    response.url()
                );
                return Ok(response);
            }

            let wait = match reset_timestamp(response.headers()) {
                Some(reset) => reset_wait(reset, Utc::now().timestamp(), self.retry.max_reset_wait),
                None => {
                    let wait = backoff.min(self.retry.max_backoff);
                    backoff = (backoff * 2).min(self.retry.max_backoff);
                    wait
                }
            };

            log::debug!(
                target: LOG_TARGET,
                "Rate limited, waiting {}ms (attempt {}/{})",
                wait.as_millis(),
                attempt,
                max_attempts
            );
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }

    /// Update rate limit from response headers.
    fn update_rate_limit(&self, response: &Response) {
        let Ok(mut rate_limit) = self.rate_limit.lock() else {
            return;
        };
        let headers = response.headers();

        if let Some(limit) = header_u64(headers, "x-ratelimit-limit") {
            rate_limit.limit = limit;
        }
        if let Some(remaining) = header_u64(headers, "x-ratelimit-remaining") {
            rate_limit.remaining = remaining;
        }
        if let Some(reset) = header_u64(headers, "x-ratelimit-reset") {
            rate_limit.reset = reset;
        }
    }
}

fn is_rate_limited(status: StatusCode) -> bool {
    status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn reset_timestamp(headers: &HeaderMap) -> Option<i64> {
    header_u64(headers, "x-ratelimit-reset").and_then(|v| i64::try_from(v).ok())
}

/// Time to wait until one second past `reset`, never longer than `cap`.
pub fn reset_wait(reset: i64, now: i64, cap: Duration) -> Duration {
    let secs = reset.saturating_sub(now).max(0).unsigned_abs() + 1;
    Duration::from_secs(secs).min(cap)
}
