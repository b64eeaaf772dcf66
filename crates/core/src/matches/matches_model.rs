//! Match domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One player's line in a stored match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchParticipant {
    pub puuid: String,
    pub champion_name: String,
    pub team_id: i32,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub win: bool,
}

/// A match stored for a tracked account.
///
/// Records are keyed by `(account_key, match_id)`; the same remote match may
/// be stored once per tracked participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub match_id: String,
    pub account_key: String,
    pub game_creation: DateTime<Utc>,
    pub game_duration_secs: i64,
    pub game_mode: String,
    pub game_version: String,
    pub queue_id: i32,
    pub participants: Vec<MatchParticipant>,
}

impl MatchRecord {
    /// The tracked account's own participant line, if present.
    pub fn own_participant(&self) -> Option<&MatchParticipant> {
        self.participants
            .iter()
            .find(|p| p.puuid == self.account_key)
    }

    pub fn to_ref(&self) -> MatchRef {
        MatchRef {
            account_key: self.account_key.clone(),
            match_id: self.match_id.clone(),
        }
    }
}

/// Lightweight pointer to a stored match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct MatchRef {
    pub account_key: String,
    pub match_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_participant() {
        let record = MatchRecord {
            match_id: "EUW1_1".to_string(),
            account_key: "me".to_string(),
            game_creation: Utc::now(),
            game_duration_secs: 1800,
            game_mode: "CLASSIC".to_string(),
            game_version: "14.1.1".to_string(),
            queue_id: 420,
            participants: vec![
                MatchParticipant {
                    puuid: "other".to_string(),
                    champion_name: "Ahri".to_string(),
                    team_id: 100,
                    kills: 1,
                    deaths: 2,
                    assists: 3,
                    win: false,
                },
                MatchParticipant {
                    puuid: "me".to_string(),
                    champion_name: "Jinx".to_string(),
                    team_id: 200,
                    kills: 10,
                    deaths: 1,
                    assists: 7,
                    win: true,
                },
            ],
        };

        let own = record.own_participant().unwrap();
        assert_eq!(own.champion_name, "Jinx");
        assert_eq!(
            record.to_ref(),
            MatchRef {
                account_key: "me".to_string(),
                match_id: "EUW1_1".to_string()
            }
        );
    }
}
