//! Bridges orchestrator progress to the realtime hub.
//!
//! The orchestrator reports from inside its sync loop. Broadcasting only
//! queues frames on each subscriber, so the reporter calls the hub inline and
//! per-account order is the order of the calls.

use std::sync::Arc;

use matchsync_ingest::sync::{SyncProgressEvent, SyncProgressReporter};
use matchsync_realtime::ProgressBroadcastHub;
use tracing::trace;

pub struct HubProgressReporter {
    hub: Arc<ProgressBroadcastHub>,
}

impl HubProgressReporter {
    pub fn new(hub: Arc<ProgressBroadcastHub>) -> Self {
        Self { hub }
    }
}

impl SyncProgressReporter for HubProgressReporter {
    fn report_progress(&self, entity_key: &str, event: SyncProgressEvent) {
        let delivered = self.hub.broadcast_progress(entity_key, &event);
        trace!("Progress for {} queued for {} clients", entity_key, delivered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::channel::mpsc as fmpsc;
    use futures::{SinkExt, StreamExt};
    use matchsync_core::authz::OwnershipCheck;
    use matchsync_realtime::{HubConfig, WsFrame};
    use std::convert::Infallible;
    use tokio_util::sync::CancellationToken;

    struct AllowAll;

    #[async_trait]
    impl OwnershipCheck for AllowAll {
        async fn is_owner(&self, _user_id: &str, _entity_key: &str) -> matchsync_core::Result<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_events_forwarded_in_order() {
        let hub = Arc::new(ProgressBroadcastHub::new(
            Arc::new(AllowAll),
            HubConfig::default(),
        ));
        let reporter = HubProgressReporter::new(hub.clone());

        let (out_tx, mut out_rx) = fmpsc::unbounded::<WsFrame>();
        let (mut in_tx, in_rx) = fmpsc::unbounded::<Result<WsFrame, Infallible>>();
        let cancel = CancellationToken::new();
        let task = {
            let hub = hub.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                hub.handle_connection(
                    out_tx.sink_map_err(|e| e.to_string()),
                    in_rx,
                    Some("alice".to_string()),
                    cancel,
                )
                .await
            })
        };

        in_tx
            .send(Ok(WsFrame::text(r#"{"type":"subscribe","entityKey":"acc-1"}"#)))
            .await
            .unwrap();
        while hub.subscriber_count("acc-1") == 0 {
            tokio::task::yield_now().await;
        }

        for i in 1..=5 {
            reporter.report_progress(
                "acc-1",
                SyncProgressEvent::Progress {
                    current: i,
                    total: 5,
                    current_item_id: None,
                },
            );
        }
        reporter.report_progress("acc-1", SyncProgressEvent::Complete { total_synced: 5 });

        let mut seen = Vec::new();
        for _ in 0..6 {
            match out_rx.next().await.unwrap() {
                WsFrame::Text { data, .. } => {
                    let value: serde_json::Value = serde_json::from_str(&data).unwrap();
                    seen.push(value["type"].as_str().unwrap().to_string());
                    if value["type"] == "sync_progress" {
                        assert_eq!(value["progress"], seen.len());
                    }
                }
                other => panic!("unexpected frame {other:?}"),
            }
        }
        assert_eq!(seen.last().map(String::as_str), Some("sync_complete"));

        cancel.cancel();
        task.await.unwrap();
    }
}
