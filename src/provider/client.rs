//! Thin wrapper around the transport shared by provider implementations.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{ProviderError, ProviderSettings, Services};
use crate::web::{join_url, HttpClient, RateLimiter, RequestOptions, ResponseHead, RetryPolicy};

/// Everything needed to call one provider's API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
    limiter: Arc<RateLimiter>,
    headers: Vec<(String, String)>,
}

impl ApiClient {
    /// `default_url` is used unless the settings override it
    pub fn new(
        provider: &str,
        rate: u32,
        default_url: &str,
        settings: &ProviderSettings,
        services: &Services,
    ) -> Self {
        Self {
            http: services.http.clone(),
            base_url: settings
                .url
                .clone()
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| default_url.to_string()),
            timeout: settings.timeout(),
            retry: settings.retry.clone(),
            limiter: services.limiters.acquire(provider, rate),
            headers: Vec::new(),
        }
    }

    /// Send `header` with every request
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and return the body of a 200 response
    pub async fn get(
        &self,
        path: &str,
        query: Vec<(String, String)>,
        cancel: &CancellationToken,
    ) -> Result<(ResponseHead, Vec<u8>), ProviderError> {
        let url = join_url(&self.base_url, path);
        trace!(%url, ?query, "Request params");

        let options = RequestOptions::new()
            .timeout(self.timeout)
            .queries(query)
            .headers(self.headers.iter().cloned())
            .retry(&self.retry)
            .limiter(&self.limiter)
            .cancel(cancel);

        let (head, body) = self.http.send_bytes(Method::GET, &url, &options).await?;
        if head.status != reqwest::StatusCode::OK {
            return Err(ProviderError::HttpStatus {
                url,
                status: head.status.as_u16(),
            });
        }

        Ok((head, body))
    }

    /// GET `path` and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
        cancel: &CancellationToken,
    ) -> Result<(ResponseHead, T), ProviderError> {
        let (head, body) = self.get(path, query, cancel).await?;
        let decoded = serde_json::from_slice(&body).map_err(|source| ProviderError::Decode {
            url: join_url(&self.base_url, path),
            source,
        })?;
        Ok((head, decoded))
    }
}

/// Build query pairs from a generic parameter map using a translation table.
///
/// Keys without a translation and empty values are skipped.
pub fn translate_params(
    params: &std::collections::HashMap<String, String>,
    table: &[(&str, &str)],
) -> Vec<(String, String)> {
    let mut query: Vec<(String, String)> = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .filter_map(|(key, value)| {
            table
                .iter()
                .find(|(from, _)| from == key)
                .map(|(_, to)| (to.to_string(), value.clone()))
        })
        .collect();
    query.sort();
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_translate_params() {
        let params: HashMap<String, String> = [
            ("country", "us"),
            ("language", ""),
            ("bogus", "x"),
            ("genre", "drama"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let query = translate_params(
            &params,
            &[("country", "countries"), ("language", "languages"), ("genre", "genres")],
        );
        assert_eq!(
            query,
            vec![
                ("countries".to_string(), "us".to_string()),
                ("genres".to_string(), "drama".to_string())
            ]
        );
    }
}
