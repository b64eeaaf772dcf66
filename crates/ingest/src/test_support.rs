//! Shared fakes for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use matchsync_game_api::{
    GameApiError, GameApiGateway, MatchDetail, ParticipantDetail, RateLimiter, RiotAccount,
};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::sync::{SyncProgressEvent, SyncProgressReporter};

pub fn sample_detail(match_id: &str, puuid: &str) -> MatchDetail {
    MatchDetail {
        match_id: match_id.to_string(),
        game_creation: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap(),
        game_duration_secs: 1_800,
        game_mode: "CLASSIC".to_string(),
        game_version: "14.1.1".to_string(),
        queue_id: 420,
        participants: vec![
            ParticipantDetail {
                puuid: puuid.to_string(),
                champion_name: "Jinx".to_string(),
                team_id: 100,
                kills: 8,
                deaths: 2,
                assists: 5,
                win: true,
            },
            ParticipantDetail {
                puuid: "someone-else".to_string(),
                champion_name: "Thresh".to_string(),
                team_id: 200,
                kills: 1,
                deaths: 6,
                assists: 4,
                win: false,
            },
        ],
    }
}

/// Match ids `"{prefix}_{i}"` for `i in 0..count`, newest first.
pub fn feed(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}_{i}")).collect()
}

/// Parks the first list call for one player until released.
#[derive(Default)]
pub struct ListHold {
    pub entered: Notify,
    pub release: Notify,
    used: AtomicBool,
}

impl ListHold {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn pass(&self) {
        if !self.used.swap(true, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListCall {
    pub puuid: String,
    pub offset: usize,
    pub count: usize,
    pub since: Option<DateTime<Utc>>,
}

/// In-memory game API. Each player has a feed of match ids, newest first.
#[derive(Default)]
pub struct FakeGateway {
    feeds: HashMap<String, Vec<String>>,
    failing_lists: HashSet<String>,
    failing_details: HashSet<String>,
    held_lists: HashMap<String, Arc<ListHold>>,
    cancel_after_details: Option<(usize, CancellationToken)>,
    limiter: Option<Arc<RateLimiter>>,
    list_calls: Mutex<Vec<ListCall>>,
    detail_calls: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, puuid: &str, ids: Vec<String>) -> Self {
        self.feeds.insert(puuid.to_string(), ids);
        self
    }

    pub fn failing_list(mut self, puuid: &str) -> Self {
        self.failing_lists.insert(puuid.to_string());
        self
    }

    pub fn failing_detail(mut self, match_id: &str) -> Self {
        self.failing_details.insert(match_id.to_string());
        self
    }

    pub fn hold_first_list(mut self, puuid: &str, hold: Arc<ListHold>) -> Self {
        self.held_lists.insert(puuid.to_string(), hold);
        self
    }

    /// Cancel `token` once `count` detail calls have been served.
    pub fn cancel_after_details(mut self, count: usize, token: CancellationToken) -> Self {
        self.cancel_after_details = Some((count, token));
        self
    }

    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn list_calls(&self) -> Vec<ListCall> {
        self.list_calls.lock().unwrap().clone()
    }

    pub fn detail_calls(&self) -> Vec<String> {
        self.detail_calls.lock().unwrap().clone()
    }

    async fn gate(&self, cancel: &CancellationToken) -> Result<(), GameApiError> {
        match &self.limiter {
            Some(limiter) => limiter.acquire(cancel).await,
            None if cancel.is_cancelled() => Err(GameApiError::Cancelled),
            None => Ok(()),
        }
    }

    fn owner_of(&self, match_id: &str) -> String {
        self.feeds
            .iter()
            .find(|(_, ids)| ids.iter().any(|id| id == match_id))
            .map(|(puuid, _)| puuid.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[async_trait]
impl GameApiGateway for FakeGateway {
    async fn lookup_account(
        &self,
        game_name: &str,
        tag_line: &str,
        cancel: &CancellationToken,
    ) -> Result<RiotAccount, GameApiError> {
        self.gate(cancel).await?;
        Ok(RiotAccount {
            puuid: format!("{game_name}-{tag_line}").to_lowercase(),
            game_name: game_name.to_string(),
            tag_line: tag_line.to_string(),
        })
    }

    async fn list_recent_match_ids(
        &self,
        puuid: &str,
        offset: usize,
        count: usize,
        since: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, GameApiError> {
        self.gate(cancel).await?;
        if let Some(hold) = self.held_lists.get(puuid) {
            hold.pass().await;
        }
        self.list_calls.lock().unwrap().push(ListCall {
            puuid: puuid.to_string(),
            offset,
            count,
            since,
        });
        if self.failing_lists.contains(puuid) {
            return Err(GameApiError::Http {
                status: 500,
                message: "boom".to_string(),
            });
        }
        let ids = self.feeds.get(puuid).cloned().unwrap_or_default();
        Ok(ids.into_iter().skip(offset).take(count).collect())
    }

    async fn get_match_detail(
        &self,
        match_id: &str,
        cancel: &CancellationToken,
    ) -> Result<MatchDetail, GameApiError> {
        self.gate(cancel).await?;
        let served = {
            let mut calls = self.detail_calls.lock().unwrap();
            calls.push(match_id.to_string());
            calls.len()
        };
        if let Some((after, token)) = &self.cancel_after_details {
            if served >= *after {
                token.cancel();
            }
        }
        if self.failing_details.contains(match_id) {
            return Err(GameApiError::UnexpectedShape(format!(
                "match detail {match_id}: missing info"
            )));
        }
        Ok(sample_detail(match_id, &self.owner_of(match_id)))
    }
}

/// Records every event it receives.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<(String, SyncProgressEvent)>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<(String, SyncProgressEvent)> {
        self.events.lock().unwrap().clone()
    }
}

impl SyncProgressReporter for RecordingReporter {
    fn report_progress(&self, entity_key: &str, event: SyncProgressEvent) {
        self.events
            .lock()
            .unwrap()
            .push((entity_key.to_string(), event));
    }
}
