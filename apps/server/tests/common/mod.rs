#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use matchsync_game_api::{
    GameApiError, GameApiGateway, MatchDetail, ParticipantDetail, RateLimitConfig, RateLimiter,
    RiotAccount,
};
use matchsync_server::{api::app_router, auth::AuthManager, build_state_with_gateway, config::Config, AppState};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const SECRET: &str = "0123456789abcdef0123456789abcdef";

/// Game API stand-in. Every player has `matches_per_player` matches with
/// ids `"{puuid}_{i}"`, newest first.
pub struct FakeGateway {
    pub matches_per_player: usize,
}

fn puuid_for(game_name: &str) -> String {
    format!("puuid-{}", game_name.to_lowercase())
}

#[async_trait]
impl GameApiGateway for FakeGateway {
    async fn lookup_account(
        &self,
        game_name: &str,
        tag_line: &str,
        _cancel: &CancellationToken,
    ) -> Result<RiotAccount, GameApiError> {
        if game_name == "Nobody" {
            return Err(GameApiError::NotFound(format!("{game_name}#{tag_line}")));
        }
        Ok(RiotAccount {
            puuid: puuid_for(game_name),
            game_name: game_name.to_string(),
            tag_line: tag_line.to_string(),
        })
    }

    async fn list_recent_match_ids(
        &self,
        puuid: &str,
        offset: usize,
        count: usize,
        _since: Option<DateTime<Utc>>,
        _cancel: &CancellationToken,
    ) -> Result<Vec<String>, GameApiError> {
        Ok((offset..(offset + count).min(self.matches_per_player))
            .map(|i| format!("{puuid}_{i}"))
            .collect())
    }

    async fn get_match_detail(
        &self,
        match_id: &str,
        _cancel: &CancellationToken,
    ) -> Result<MatchDetail, GameApiError> {
        let (puuid, _) = match_id
            .rsplit_once('_')
            .ok_or_else(|| GameApiError::NotFound(match_id.to_string()))?;
        Ok(MatchDetail {
            match_id: match_id.to_string(),
            game_creation: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap(),
            game_duration_secs: 1_500,
            game_mode: "ARAM".to_string(),
            game_version: "14.2.1".to_string(),
            queue_id: 450,
            participants: vec![ParticipantDetail {
                puuid: puuid.to_string(),
                champion_name: "Lux".to_string(),
                team_id: 100,
                kills: 4,
                deaths: 3,
                assists: 17,
                win: true,
            }],
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

pub async fn test_app(jwt_secret: Option<&str>, admins: &[&str]) -> TestApp {
    let config = Config {
        jwt_secret: jwt_secret.map(str::to_string),
        admin_users: admins.iter().map(|a| a.to_string()).collect(),
        ..Config::default()
    };
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig::default()).unwrap());
    let gateway = Arc::new(FakeGateway {
        matches_per_player: 30,
    });
    let state = build_state_with_gateway(&config, limiter, gateway, CancellationToken::new())
        .await
        .unwrap();
    TestApp {
        router: app_router(state.clone(), &config),
        state,
    }
}

pub fn token_for(user: &str) -> String {
    AuthManager::new(SECRET.as_bytes())
        .issue_token(user, Duration::from_secs(300))
        .unwrap()
}

impl TestApp {
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&bytes).into()));
        (status, value)
    }

    /// Poll the sync status until the background sync settles.
    pub async fn wait_for_sync(&self, key: &str, token: Option<&str>) -> serde_json::Value {
        for _ in 0..200 {
            let (status, body) = self
                .call(
                    Method::GET,
                    &format!("/api/v1/accounts/{key}/sync-status"),
                    token,
                    None,
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            if body["syncStatus"] == "completed" || body["syncStatus"] == "failed" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("sync of {key} did not settle");
    }
}
