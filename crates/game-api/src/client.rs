//! Game API gateway.
//!
//! [`GameApiGateway`] is the typed surface the ingestion pipeline calls.
//! [`RiotApiClient`] implements it over HTTP: every attempt first takes a
//! permit from the shared [`RateLimiter`], 429 responses are retried after the
//! server's `Retry-After`, and bodies go through the parse step in
//! [`crate::models`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::{GameApiError, RetryClass};
use crate::models::{parse_account, parse_match_detail, parse_match_ids, MatchDetail, RiotAccount};
use crate::rate_limiter::RateLimiter;

/// Default regional routing host.
pub const DEFAULT_BASE_URL: &str = "https://europe.api.riotgames.com";

/// Wait used when a 429 or 5xx arrives without a Retry-After header.
const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(1);

/// Upper bound on a single server-requested wait.
const MAX_RETRY_WAIT: Duration = Duration::from_secs(120);

/// Typed calls against the game API.
///
/// Implementations must gate every HTTP round-trip on the rate limiter.
#[async_trait]
pub trait GameApiGateway: Send + Sync {
    /// Resolve a Riot id (`game_name#tag_line`) to an account.
    async fn lookup_account(
        &self,
        game_name: &str,
        tag_line: &str,
        cancel: &CancellationToken,
    ) -> Result<RiotAccount, GameApiError>;

    /// List match ids for a player, newest first.
    ///
    /// Incremental sync stops at the first id it already stores, so it relies
    /// on this ordering being strict.
    async fn list_recent_match_ids(
        &self,
        puuid: &str,
        offset: usize,
        count: usize,
        since: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, GameApiError>;

    /// Fetch one match.
    async fn get_match_detail(
        &self,
        match_id: &str,
        cancel: &CancellationToken,
    ) -> Result<MatchDetail, GameApiError>;
}

/// Client configuration.
#[derive(Clone, Debug)]
pub struct RiotApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout: Duration,
    /// Extra attempts after a 429 or 5xx response.
    pub max_retries: u32,
}

impl Default for RiotApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// HTTP implementation of [`GameApiGateway`].
pub struct RiotApiClient {
    client: Client,
    config: RiotApiConfig,
    limiter: Arc<RateLimiter>,
}

impl RiotApiClient {
    pub fn new(config: RiotApiConfig, limiter: Arc<RateLimiter>) -> Result<Self, GameApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GameApiError::InvalidConfig(format!("HTTP client: {}", e)))?;

        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(GameApiError::InvalidConfig("empty base URL".to_string()));
        }

        Ok(Self {
            client,
            config: RiotApiConfig { base_url, ..config },
            limiter,
        })
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// GET `path` and return the body of the first successful attempt.
    async fn fetch(
        &self,
        path: &str,
        query: &[(&str, String)],
        cancel: &CancellationToken,
    ) -> Result<String, GameApiError> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut attempt: u32 = 0;

        loop {
            self.limiter.acquire(cancel).await?;

            debug!("Game API request: {} (attempt {})", path, attempt + 1);
            let request = self
                .client
                .get(&url)
                .header("X-Riot-Token", &self.config.api_key)
                .query(query);

            let response = tokio::select! {
                _ = cancel.cancelled() => return Err(GameApiError::Cancelled),
                response = request.send() => response,
            };

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    let error = if e.is_timeout() {
                        GameApiError::Timeout
                    } else {
                        GameApiError::Network(e)
                    };
                    self.retry_or_fail(error, None, &mut attempt, cancel).await?;
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return response.text().await.map_err(GameApiError::Network);
            }

            let retry_after = parse_retry_after(
                response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok()),
            );
            let body = response.text().await.unwrap_or_default();
            let error = classify_status(status, retry_after, path, body);

            self.retry_or_fail(error, retry_after, &mut attempt, cancel)
                .await?;
        }
    }

    /// Sleep before the next attempt when the error is transient and retries
    /// remain; otherwise hand the error back.
    async fn retry_or_fail(
        &self,
        error: GameApiError,
        retry_after: Option<Duration>,
        attempt: &mut u32,
        cancel: &CancellationToken,
    ) -> Result<(), GameApiError> {
        if error.retry_class() != RetryClass::WithBackoff || *attempt >= self.config.max_retries {
            return Err(error);
        }
        *attempt += 1;

        let wait = retry_after
            .unwrap_or(DEFAULT_RETRY_WAIT * *attempt)
            .min(MAX_RETRY_WAIT);
        warn!(
            "Game API transient failure ({}), retrying in {:?} ({}/{})",
            error, wait, attempt, self.config.max_retries
        );

        tokio::select! {
            _ = cancel.cancelled() => Err(GameApiError::Cancelled),
            _ = tokio::time::sleep(wait) => Ok(()),
        }
    }
}

/// Map a non-success status to an error.
fn classify_status(
    status: StatusCode,
    retry_after: Option<Duration>,
    path: &str,
    body: String,
) -> GameApiError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => GameApiError::RateLimited { retry_after },
        StatusCode::NOT_FOUND => GameApiError::NotFound(path.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GameApiError::Unauthorized,
        StatusCode::GATEWAY_TIMEOUT => GameApiError::Timeout,
        other => GameApiError::Http {
            status: other.as_u16(),
            message: if body.is_empty() {
                other.canonical_reason().unwrap_or("unknown").to_string()
            } else {
                body
            },
        },
    }
}

/// Retry-After is given in whole seconds by this API.
fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl GameApiGateway for RiotApiClient {
    async fn lookup_account(
        &self,
        game_name: &str,
        tag_line: &str,
        cancel: &CancellationToken,
    ) -> Result<RiotAccount, GameApiError> {
        let path = format!(
            "/riot/account/v1/accounts/by-riot-id/{}/{}",
            urlencoding::encode(game_name),
            urlencoding::encode(tag_line)
        );
        let body = self.fetch(&path, &[], cancel).await?;
        parse_account(&body)
    }

    async fn list_recent_match_ids(
        &self,
        puuid: &str,
        offset: usize,
        count: usize,
        since: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, GameApiError> {
        let path = format!(
            "/lol/match/v5/matches/by-puuid/{}/ids",
            urlencoding::encode(puuid)
        );
        let mut query = vec![("start", offset.to_string()), ("count", count.to_string())];
        if let Some(since) = since {
            query.push(("startTime", since.timestamp().to_string()));
        }
        let body = self.fetch(&path, &query, cancel).await?;
        parse_match_ids(&body)
    }

    async fn get_match_detail(
        &self,
        match_id: &str,
        cancel: &CancellationToken,
    ) -> Result<MatchDetail, GameApiError> {
        let path = format!("/lol/match/v5/matches/{}", urlencoding::encode(match_id));
        let body = self.fetch(&path, &[], cancel).await?;
        parse_match_detail(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limiter::RateLimitConfig;

    #[test]
    fn test_classify_status() {
        let err = classify_status(
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(3)),
            "/x",
            String::new(),
        );
        assert!(matches!(
            err,
            GameApiError::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(3)
        ));

        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, None, "/m/1", String::new()),
            GameApiError::NotFound(p) if p == "/m/1"
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, None, "/x", String::new()),
            GameApiError::Unauthorized
        ));

        match classify_status(StatusCode::SERVICE_UNAVAILABLE, None, "/x", String::new()) {
            GameApiError::Http { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "Service Unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after(Some("7")), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after(Some(" 2 ")), Some(Duration::from_secs(2)));
        assert_eq!(parse_retry_after(Some("soon")), None);
        assert_eq!(parse_retry_after(None), None);
    }

    #[test]
    fn test_client_rejects_empty_base_url() {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::default()).unwrap());
        let config = RiotApiConfig {
            base_url: " / ".to_string(),
            ..RiotApiConfig::default()
        };
        assert!(matches!(
            RiotApiClient::new(config, limiter),
            Err(GameApiError::InvalidConfig(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_failures_are_retried() {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::default()).unwrap());
        let config = RiotApiConfig {
            // Nothing listens on port 1.
            base_url: "http://127.0.0.1:1".to_string(),
            max_retries: 2,
            ..RiotApiConfig::default()
        };
        let client = RiotApiClient::new(config, limiter.clone()).unwrap();

        let result = client
            .get_match_detail("EUW1_1", &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(GameApiError::Network(_) | GameApiError::Timeout)
        ));
        // One permit per attempt: the first try plus two retries.
        let snapshot = limiter.snapshot();
        assert_eq!(snapshot.long_capacity - snapshot.long_available, 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_request() {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::default()).unwrap());
        let client = RiotApiClient::new(RiotApiConfig::default(), limiter).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = client.get_match_detail("EUW1_1", &cancel).await;
        assert!(matches!(result, Err(GameApiError::Cancelled)));
    }
}
