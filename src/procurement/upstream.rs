//! Cached, rate-limited HTTP client for upstream sources.

use std::time::Duration;

use super::cache::ResponseCache;
use super::rate_limit::RateLimiter;
use crate::config::ProcurementSettings;
use crate::sources::{SourceError, UpstreamRequest};

const USER_AGENT: &str = concat!("ArquiAlert/", env!("CARGO_PKG_VERSION"));

/// Where a response body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyOrigin {
    Network,
    Cache,
    /// Expired cache entry served because the host was over its request budget.
    StaleCache,
}

#[derive(Debug, Clone)]
pub struct Fetched {
    pub body: String,
    pub origin: BodyOrigin,
    /// HTTP attempts made, zero when served from cache.
    pub attempts: u32,
}

#[derive(Debug)]
pub struct FetchFailure {
    pub error: SourceError,
    pub attempts: u32,
}

pub struct UpstreamClient {
    http: reqwest::Client,
    cache: ResponseCache,
    limiter: RateLimiter,
    settings: ProcurementSettings,
}

impl UpstreamClient {
    pub fn new(settings: ProcurementSettings) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.fetch_timeout)
            .build()?;

        Ok(Self {
            http,
            cache: ResponseCache::new(settings.cache_ttl, settings.cache_capacity),
            limiter: RateLimiter::per_minute(settings.rate_limit_per_minute),
            settings,
        })
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Fetch a body, consulting the cache unless `refresh` is set.
    ///
    /// A request refused by the rate limiter is never sent; a stale cache entry is
    /// served instead when one exists.
    pub async fn fetch(
        &self,
        request: &UpstreamRequest,
        refresh: bool,
    ) -> Result<Fetched, FetchFailure> {
        let key = request.cache_key();
        let cached = self.cache.get(&key).await;

        if !refresh {
            if let Some(hit) = cached.as_ref().filter(|hit| hit.fresh) {
                tracing::debug!(url = %request.url, "cache hit");
                return Ok(Fetched {
                    body: hit.body.clone(),
                    origin: BodyOrigin::Cache,
                    attempts: 0,
                });
            }
        }

        let host = request.host();
        if !self.limiter.try_acquire(&host).await {
            tracing::warn!(host = %host, "rate limit reached, request not sent");
            return match cached {
                Some(stale) => Ok(Fetched {
                    body: stale.body,
                    origin: BodyOrigin::StaleCache,
                    attempts: 0,
                }),
                None => Err(FetchFailure {
                    error: SourceError::RateLimited(host),
                    attempts: 0,
                }),
            };
        }

        let (result, attempts) = self.send_with_retry(request).await;
        match result {
            Ok(body) => {
                self.cache.insert(&key, body.clone()).await;
                Ok(Fetched {
                    body,
                    origin: BodyOrigin::Network,
                    attempts,
                })
            }
            Err(error) => Err(FetchFailure { error, attempts }),
        }
    }

    /// Send with up to `max_retries` retries, sleeping `base * attempt` between tries.
    async fn send_with_retry(&self, request: &UpstreamRequest) -> (Result<String, SourceError>, u32) {
        let max_tries = self.settings.max_retries + 1;
        let mut last_error = SourceError::Http("no attempt made".to_string());

        for attempt in 1..=max_tries {
            match self.send_once(request).await {
                Ok(body) => {
                    if attempt > 1 {
                        tracing::info!(url = %request.url, attempt, "upstream recovered after retry");
                    }
                    return (Ok(body), attempt);
                }
                Err(err) => {
                    tracing::warn!(
                        url = %request.url,
                        attempt,
                        max_tries,
                        error = %err,
                        "upstream request failed"
                    );
                    last_error = err;
                }
            }

            if attempt < max_tries {
                tokio::time::sleep(self.retry_delay(attempt)).await;
            }
        }

        (Err(last_error), max_tries)
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        self.settings.retry_base_delay * attempt
    }

    async fn send_once(&self, request: &UpstreamRequest) -> Result<String, SourceError> {
        let mut builder = self.http.request(request.method.clone(), &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_is_linear() {
        let client = UpstreamClient::new(ProcurementSettings::default()).unwrap();
        assert_eq!(client.retry_delay(1), Duration::from_secs(2));
        assert_eq!(client.retry_delay(2), Duration::from_secs(4));
        assert_eq!(client.retry_delay(3), Duration::from_secs(6));
    }
}
