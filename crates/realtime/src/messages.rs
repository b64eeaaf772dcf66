//! JSON wire messages.

use matchsync_ingest::sync::SyncProgressEvent;
use serde::{Deserialize, Serialize};

/// Client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe {
        #[serde(rename = "entityKey")]
        entity_key: String,
    },
    Unsubscribe {
        #[serde(rename = "entityKey")]
        entity_key: String,
    },
}

/// Server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum SyncProgressMessage {
    #[serde(rename = "sync_progress", rename_all = "camelCase")]
    Progress {
        entity_key: String,
        status: String,
        progress: usize,
        total: usize,
        current_item_id: Option<String>,
    },
    #[serde(rename = "sync_complete", rename_all = "camelCase")]
    Complete {
        entity_key: String,
        status: String,
        total_synced: usize,
    },
    #[serde(rename = "sync_error", rename_all = "camelCase")]
    Error {
        entity_key: String,
        status: String,
        error: String,
    },
}

impl SyncProgressMessage {
    pub fn from_event(entity_key: &str, event: &SyncProgressEvent) -> Self {
        let entity_key = entity_key.to_string();
        match event {
            SyncProgressEvent::Progress {
                current,
                total,
                current_item_id,
            } => SyncProgressMessage::Progress {
                entity_key,
                status: "syncing".to_string(),
                progress: *current,
                total: *total,
                current_item_id: current_item_id.clone(),
            },
            SyncProgressEvent::Complete { total_synced } => SyncProgressMessage::Complete {
                entity_key,
                status: "completed".to_string(),
                total_synced: *total_synced,
            },
            SyncProgressEvent::Error { message } => SyncProgressMessage::Error {
                entity_key,
                status: "failed".to_string(),
                error: message.clone(),
            },
        }
    }
}
