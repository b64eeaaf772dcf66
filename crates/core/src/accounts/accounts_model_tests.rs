use super::*;
use chrono::Utc;

fn new_account() -> NewAccount {
    NewAccount {
        key: "puuid-1".to_string(),
        owner_user_id: "user-1".to_string(),
        game_name: "Faker".to_string(),
        tag_line: "KR1".to_string(),
    }
}

#[test]
fn test_new_account_validation() {
    assert!(new_account().validate().is_ok());

    let mut missing_key = new_account();
    missing_key.key = "  ".to_string();
    assert!(missing_key.validate().is_err());

    let mut missing_tag = new_account();
    missing_tag.tag_line = String::new();
    assert!(missing_tag.validate().is_err());
}

#[test]
fn test_new_account_starts_pending() {
    let account = new_account().into_account(Utc::now());
    assert_eq!(account.sync_status, SyncStatus::Pending);
    assert!(account.last_synced_at.is_none());
    assert_eq!(account.riot_id(), "Faker#KR1");
}

#[test]
fn test_sync_status_in_flight() {
    assert!(SyncStatus::Pending.is_in_flight());
    assert!(SyncStatus::Syncing.is_in_flight());
    assert!(!SyncStatus::Idle.is_in_flight());
    assert!(!SyncStatus::Completed.is_in_flight());
    assert!(!SyncStatus::Failed.is_in_flight());
}

#[test]
fn test_sync_status_serialization() {
    let statuses = vec![
        (SyncStatus::Idle, "\"idle\""),
        (SyncStatus::Pending, "\"pending\""),
        (SyncStatus::Syncing, "\"syncing\""),
        (SyncStatus::Completed, "\"completed\""),
        (SyncStatus::Failed, "\"failed\""),
    ];

    for (status, expected) in statuses {
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, expected);
        assert_eq!(format!("\"{}\"", status), expected);
    }
}
