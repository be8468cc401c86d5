//! Blocking JSON-over-HTTP client with retry and circuit breaker logic.
//!
//! Every upstream API (FRED, Yahoo, Treasury, GDELT) goes through `get_json`,
//! so status handling is identical across providers:
//! - 403 trips the breaker immediately
//! - 429 and 5xx count as failures and are retried with exponential backoff
//! - 401 is an authentication error, 400/404 are rejections (no retry)

use super::circuit_breaker::CircuitBreaker;
use super::provider::DataError;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Transport knobs shared by all providers.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
        }
    }
}

pub struct HttpClient {
    client: reqwest::blocking::Client,
    breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl HttpClient {
    pub fn new(breaker: Arc<CircuitBreaker>, settings: &HttpSettings) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            breaker,
            max_retries: settings.max_retries,
            base_delay: settings.base_delay,
        })
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    fn tripped(&self) -> DataError {
        DataError::CircuitBreakerTripped {
            provider: self.breaker.name().to_string(),
        }
    }

    /// GET `url` with `query` and decode the JSON body. `id` labels errors.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        id: &str,
    ) -> Result<T, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(id, attempt, ?delay, "retrying request");
                std::thread::sleep(delay);
            }

            if !self.breaker.is_allowed() {
                return Err(self.tripped());
            }

            let resp = match self.client.get(url).query(query).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.breaker.record_failure();
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();

            if status == reqwest::StatusCode::FORBIDDEN {
                self.breaker.trip();
                return Err(self.tripped());
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(DataError::AuthenticationRequired(format!(
                    "{} refused the credentials for '{id}'",
                    self.breaker.name()
                )));
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(DataError::SeriesNotFound { id: id.to_string() });
            }

            if status.is_client_error() {
                let message = resp.text().unwrap_or_default();
                return Err(DataError::Rejected {
                    id: id.to_string(),
                    status: status.as_u16(),
                    message: message.chars().take(200).collect(),
                });
            }

            if !status.is_success() {
                self.breaker.record_failure();
                last_error = Some(DataError::Other(format!("HTTP {status} for {id}")));
                continue;
            }

            let body: T = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!("failed to parse response for {id}: {e}"))
            })?;
            self.breaker.record_success();
            return Ok(body);
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}
