//! Typed records parsed from game API responses.
//!
//! Raw response structs mirror the upstream JSON and stay private. The public
//! records ([`RiotAccount`], [`MatchDetail`]) are produced by the `parse_*`
//! functions, which are the single place where payload shape is validated.

use chrono::{DateTime, TimeZone, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::errors::GameApiError;

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from /riot/account/v1/accounts/by-riot-id
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    puuid: String,
    game_name: Option<String>,
    tag_line: Option<String>,
}

/// Response from /lol/match/v5/matches/{matchId}
#[derive(Debug, Deserialize)]
struct MatchResponse {
    metadata: MatchMetadata,
    info: MatchInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchMetadata {
    match_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchInfo {
    /// Unix milliseconds
    game_creation: i64,
    /// Seconds for patches after 11.20, milliseconds before
    game_duration: i64,
    /// Present only on patches after 11.20
    game_end_timestamp: Option<i64>,
    game_mode: String,
    #[serde(default)]
    game_version: String,
    queue_id: i32,
    participants: Vec<ParticipantResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantResponse {
    puuid: String,
    champion_name: String,
    team_id: i32,
    kills: u32,
    deaths: u32,
    assists: u32,
    win: bool,
}

// ============================================================================
// Typed records
// ============================================================================

/// Account identity resolved from a Riot id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiotAccount {
    pub puuid: String,
    pub game_name: String,
    pub tag_line: String,
}

/// One participant of a match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDetail {
    pub puuid: String,
    pub champion_name: String,
    pub team_id: i32,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub win: bool,
}

/// Validated match detail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchDetail {
    pub match_id: String,
    pub game_creation: DateTime<Utc>,
    pub game_duration_secs: i64,
    pub game_mode: String,
    pub game_version: String,
    pub queue_id: i32,
    pub participants: Vec<ParticipantDetail>,
}

impl MatchDetail {
    pub fn has_participant(&self, puuid: &str) -> bool {
        self.participants.iter().any(|p| p.puuid == puuid)
    }
}

// ============================================================================
// Parse step
// ============================================================================

fn decode<T: DeserializeOwned>(body: &str, what: &str) -> Result<T, GameApiError> {
    serde_json::from_str(body)
        .map_err(|e| GameApiError::UnexpectedShape(format!("{}: {}", what, e)))
}

/// Parse an account lookup response.
pub fn parse_account(body: &str) -> Result<RiotAccount, GameApiError> {
    let raw: AccountResponse = decode(body, "account")?;
    if raw.puuid.trim().is_empty() {
        return Err(GameApiError::UnexpectedShape(
            "account: empty puuid".to_string(),
        ));
    }
    Ok(RiotAccount {
        puuid: raw.puuid,
        game_name: raw.game_name.unwrap_or_default(),
        tag_line: raw.tag_line.unwrap_or_default(),
    })
}

/// Parse a match id list response.
pub fn parse_match_ids(body: &str) -> Result<Vec<String>, GameApiError> {
    let ids: Vec<String> = decode(body, "match id list")?;
    if ids.iter().any(|id| id.trim().is_empty()) {
        return Err(GameApiError::UnexpectedShape(
            "match id list: blank id".to_string(),
        ));
    }
    Ok(ids)
}

/// Parse a match detail response.
pub fn parse_match_detail(body: &str) -> Result<MatchDetail, GameApiError> {
    let raw: MatchResponse = decode(body, "match detail")?;
    let info = raw.info;

    let game_creation = Utc
        .timestamp_millis_opt(info.game_creation)
        .single()
        .ok_or_else(|| {
            GameApiError::UnexpectedShape(format!(
                "match detail: invalid gameCreation {}",
                info.game_creation
            ))
        })?;

    // Older payloads report milliseconds and omit gameEndTimestamp.
    let game_duration_secs = if info.game_end_timestamp.is_some() {
        info.game_duration
    } else {
        info.game_duration / 1000
    };

    if info.participants.is_empty() {
        return Err(GameApiError::UnexpectedShape(format!(
            "match detail {}: no participants",
            raw.metadata.match_id
        )));
    }

    Ok(MatchDetail {
        match_id: raw.metadata.match_id,
        game_creation,
        game_duration_secs,
        game_mode: info.game_mode,
        game_version: info.game_version,
        queue_id: info.queue_id,
        participants: info
            .participants
            .into_iter()
            .map(|p| ParticipantDetail {
                puuid: p.puuid,
                champion_name: p.champion_name,
                team_id: p.team_id,
                kills: p.kills,
                deaths: p.deaths,
                assists: p.assists,
                win: p.win,
            })
            .collect(),
    })
}
