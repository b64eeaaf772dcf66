//! Conversion of validated API records into stored records.

use matchsync_core::matches::{MatchParticipant, MatchRecord};
use matchsync_game_api::MatchDetail;

/// Build the record stored for `account_key` from a fetched match.
///
/// The same match seen by two tracked accounts is stored once per account.
pub fn to_match_record(detail: MatchDetail, account_key: &str) -> MatchRecord {
    MatchRecord {
        match_id: detail.match_id,
        account_key: account_key.to_string(),
        game_creation: detail.game_creation,
        game_duration_secs: detail.game_duration_secs,
        game_mode: detail.game_mode,
        game_version: detail.game_version,
        queue_id: detail.queue_id,
        participants: detail
            .participants
            .into_iter()
            .map(|p| MatchParticipant {
                puuid: p.puuid,
                champion_name: p.champion_name,
                team_id: p.team_id,
                kills: p.kills,
                deaths: p.deaths,
                assists: p.assists,
                win: p.win,
            })
            .collect(),
    }
}
