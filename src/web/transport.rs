//! Single HTTP request primitive with pacing, timeout and retry.

use std::future::Future;
use std::time::Duration;

use reqwest::{Method, Response};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::ratelimit::RateLimiter;
use super::retry::RetryPolicy;

const USER_AGENT: &str = concat!("mediarr/", env!("CARGO_PKG_VERSION"));

/// Errors raised by the transport layer
#[derive(Debug, Error)]
pub enum WebError {
    #[error("Request to {url} timed out after {attempts} attempt(s)")]
    Timeout {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} failed after {attempts} attempt(s): {source}")]
    Transport {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed reading response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request cancelled")]
    Cancelled,
}

impl WebError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WebError::Timeout { .. })
    }
}

/// Per-request settings for `HttpClient::send`
#[derive(Debug, Default, Clone)]
pub struct RequestOptions<'a> {
    /// Per-attempt timeout (none means the client default)
    pub timeout: Option<Duration>,

    /// Query string parameters
    pub query: Vec<(String, String)>,

    /// Extra request headers
    pub headers: Vec<(String, String)>,

    /// Retry policy; none means a single attempt
    pub retry: Option<&'a RetryPolicy>,

    /// Limiter to wait on before every attempt
    pub limiter: Option<&'a RateLimiter>,

    /// Aborts waits between attempts and in-flight requests
    pub cancel: Option<&'a CancellationToken>,
}

impl<'a> RequestOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn queries(mut self, query: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(query);
        self
    }

    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn retry(mut self, policy: &'a RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn limiter(mut self, limiter: &'a RateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn cancel(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Shared HTTP client
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a client with the default user agent
    pub fn new() -> Result<Self, WebError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(WebError::Client)?;

        Ok(Self { client })
    }

    /// Send a request, retrying according to `options.retry`.
    ///
    /// Timeouts and connection failures are retried until attempts run out,
    /// then surfaced. Responses with a retryable status or an unexpected
    /// content type are drained and retried; once attempts run out the last
    /// response is returned as-is for the caller to judge.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions<'_>,
    ) -> Result<Response, WebError> {
        let no_retry = RetryPolicy::none();
        let policy = options.retry.unwrap_or(&no_retry);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            if options.cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(WebError::Cancelled);
            }

            if let Some(limiter) = options.limiter {
                cancellable(options.cancel, limiter.take()).await?;
            }

            let request = self.build_request(method.clone(), url, options);
            let result = cancellable(options.cancel, request.send()).await?;

            let response = match result {
                Ok(response) => response,
                Err(err) => {
                    debug!(%url, attempt, error = %err, "Failed requesting");

                    let transient = err.is_timeout() || err.is_connect();
                    if transient && policy.should_retry(attempt) {
                        let delay = policy.backoff(attempt);
                        debug!(%url, ?delay, "Retrying failed request");
                        cancellable(options.cancel, tokio::time::sleep(delay)).await?;
                        continue;
                    }

                    return Err(if err.is_timeout() {
                        WebError::Timeout {
                            url: url.to_string(),
                            attempts: attempt,
                            source: err,
                        }
                    } else {
                        WebError::Transport {
                            url: url.to_string(),
                            attempts: attempt,
                            source: err,
                        }
                    });
                }
            };

            let status = response.status();
            trace!(url = %response.url(), %status, "Request response");

            if !policy.should_retry(attempt) {
                return Ok(response);
            }

            if policy.is_retryable_status(status.as_u16()) {
                drain(response).await;
                let delay = policy.backoff(attempt);
                debug!(%url, %status, ?delay, "Retrying request with retryable status");
                cancellable(options.cancel, tokio::time::sleep(delay)).await?;
                continue;
            }

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            if !policy.content_type_matches(content_type.as_deref()) {
                drain(response).await;
                let delay = policy.backoff(attempt);
                debug!(
                    %url,
                    %status,
                    content_type = content_type.as_deref().unwrap_or_default(),
                    ?delay,
                    "Retrying request with unexpected content type"
                );
                cancellable(options.cancel, tokio::time::sleep(delay)).await?;
                continue;
            }

            return Ok(response);
        }
    }

    /// Send and read the whole body
    pub async fn send_bytes(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions<'_>,
    ) -> Result<(ResponseHead, Vec<u8>), WebError> {
        let response = self.send(method, url, options).await?;
        let head = response_head(&response);
        let body = response.bytes().await.map_err(|source| WebError::Body {
            url: url.to_string(),
            source,
        })?;

        Ok((head, body.to_vec()))
    }

    fn build_request(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions<'_>,
    ) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method, url);

        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        for (key, value) in &options.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        request
    }
}

/// Status line and headers of a response whose body has been consumed
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: reqwest::StatusCode,
    pub headers: reqwest::header::HeaderMap,
}

impl ResponseHead {
    /// Look up a header as a string
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

fn response_head(response: &Response) -> ResponseHead {
    ResponseHead {
        status: response.status(),
        headers: response.headers().clone(),
    }
}

async fn drain(response: Response) {
    let _ = response.bytes().await;
}

async fn cancellable<F: Future>(
    cancel: Option<&CancellationToken>,
    future: F,
) -> Result<F::Output, WebError> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(WebError::Cancelled),
            output = future => Ok(output),
        },
        None => Ok(future.await),
    }
}

/// Join a base URL and a path with exactly one slash between them
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://api.trakt.tv", "/shows/popular"), "https://api.trakt.tv/shows/popular");
        assert_eq!(join_url("https://api.trakt.tv/", "shows/popular"), "https://api.trakt.tv/shows/popular");
        assert_eq!(join_url("http://localhost:8989/api/", "/series"), "http://localhost:8989/api/series");
    }

    #[test]
    fn test_request_options_builder() {
        let policy = RetryPolicy::default();
        let options = RequestOptions::new()
            .timeout(Duration::from_secs(15))
            .query("page", "1")
            .header("trakt-api-version", "2")
            .retry(&policy);

        assert_eq!(options.timeout, Some(Duration::from_secs(15)));
        assert_eq!(options.query, vec![("page".to_string(), "1".to_string())]);
        assert_eq!(options.headers.len(), 1);
        assert!(options.retry.is_some());
        assert!(options.limiter.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let client = HttpClient::new().unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let options = RequestOptions::new().cancel(&token);
        let result = client.send(Method::GET, "http://127.0.0.1:9/", &options).await;
        assert!(matches!(result, Err(WebError::Cancelled)));
    }
}
