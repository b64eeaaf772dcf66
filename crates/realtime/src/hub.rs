//! Progress broadcast hub.
//!
//! Lifecycle of a connection: `Connecting -> Open -> Subscribed(0..n) ->
//! Closing -> Closed`. A connection is registered when it opens and is
//! removed from the registry and from every subscription set on any terminal
//! transition, including when the future driving it is dropped.
//!
//! Broadcasts never wait on a client. A client that stops reading is closed
//! once its outbound queue fills or a single write outlasts the send timeout.

use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::{Sink, Stream, StreamExt};
use matchsync_core::authz::OwnershipCheck;
use matchsync_ingest::sync::SyncProgressEvent;
use serde::Serialize;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::connection::{boxed_sink, ClientConnection};
use crate::frame::{CloseReason, MessageAssembler, WsFrame};
use crate::messages::{ClientMessage, SyncProgressMessage};

const DEFAULT_MAX_MESSAGE_BYTES: usize = 4 * 1024;
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_OUTBOUND_QUEUE: usize = 64;
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Largest accepted inbound message, after reassembly.
    pub max_message_bytes: usize,
    /// Period of server pings on idle and busy connections alike.
    pub heartbeat_interval: Duration,
    /// Frames a connection may have queued before it is dropped as too slow.
    pub outbound_queue: usize,
    /// Longest a single frame write or the final close may take.
    pub send_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HubStats {
    pub connections: usize,
    pub subscribed_entities: usize,
    pub subscriptions: usize,
}

/// Fans sync progress out to the clients watching each entity.
pub struct ProgressBroadcastHub {
    config: HubConfig,
    authz: Arc<dyn OwnershipCheck>,
    connections: DashMap<Uuid, Arc<ClientConnection>>,
    /// entity key -> ids of subscribed connections
    subscriptions: DashMap<String, HashSet<Uuid>>,
}

/// Removes a connection from the hub when dropped.
struct Registration<'a> {
    hub: &'a ProgressBroadcastHub,
    connection: Arc<ClientConnection>,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.hub.unregister(&self.connection);
    }
}

impl ProgressBroadcastHub {
    pub fn new(authz: Arc<dyn OwnershipCheck>, config: HubConfig) -> Self {
        Self {
            config,
            authz,
            connections: DashMap::new(),
            subscriptions: DashMap::new(),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Drive one client connection until it closes.
    ///
    /// `user_id` is the authenticated owner of the connection; `None` closes
    /// the transport with code 4401 before the connection is registered.
    /// `cancel` closes the connection with 1001.
    pub async fn handle_connection<S, SE, R, RE>(
        &self,
        sink: S,
        mut stream: R,
        user_id: Option<String>,
        cancel: CancellationToken,
    ) where
        S: Sink<WsFrame, Error = SE> + Send + 'static,
        SE: Display,
        R: Stream<Item = Result<WsFrame, RE>> + Send + Unpin,
        RE: Display,
    {
        let Some(user_id) = user_id else {
            info!("Rejecting unauthenticated WebSocket connection");
            let connection =
                ClientConnection::new("", boxed_sink(sink), 1, self.config.send_timeout);
            if let Err(e) = connection.send(WsFrame::Close(Some(CloseReason::unauthenticated()))) {
                debug!("Failed to send close frame: {}", e);
            }
            connection.close().await;
            return;
        };

        let connection = Arc::new(ClientConnection::new(
            user_id,
            boxed_sink(sink),
            self.config.outbound_queue,
            self.config.send_timeout,
        ));
        let _registration = self.register(connection.clone());

        let mut assembler = MessageAssembler::new(self.config.max_message_bytes);
        let period = self.config.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let close_reason = loop {
            tokio::select! {
                _ = cancel.cancelled() => break Some(CloseReason::going_away()),
                _ = connection.dead() => {
                    debug!(connection_id = %connection.id(), "Outbound side failed");
                    break None;
                }
                _ = heartbeat.tick() => {
                    if let Err(e) = connection.send(WsFrame::Ping(Vec::new())) {
                        debug!(connection_id = %connection.id(), "Heartbeat failed: {}", e);
                        break None;
                    }
                }
                frame = stream.next() => match frame {
                    None => break None,
                    Some(Err(e)) => {
                        debug!(connection_id = %connection.id(), "Transport error: {}", e);
                        break None;
                    }
                    Some(Ok(WsFrame::Close(_))) => break Some(CloseReason::normal()),
                    Some(Ok(WsFrame::Text { data, fin })) => match assembler.push(&data, fin) {
                        Ok(Some(text)) => self.handle_text(&connection, &text).await,
                        Ok(None) => {}
                        Err(e) => {
                            warn!(connection_id = %connection.id(), "Closing connection: {}", e);
                            break Some(CloseReason::too_large());
                        }
                    },
                    Some(Ok(WsFrame::Binary(_) | WsFrame::Ping(_) | WsFrame::Pong(_))) => {}
                },
            }
        };

        if let Some(reason) = close_reason {
            if let Err(e) = connection.send(WsFrame::Close(Some(reason))) {
                debug!(connection_id = %connection.id(), "Failed to send close frame: {}", e);
            }
        }
        connection.close().await;
    }

    /// Serialize `event` once and queue it on every connection subscribed to
    /// `entity_key`. Never waits on a client; a subscriber whose queue is
    /// full is closed instead. Returns how many frames were queued.
    pub fn broadcast_progress(&self, entity_key: &str, event: &SyncProgressEvent) -> usize {
        let message = SyncProgressMessage::from_event(entity_key, event);
        let payload = match serde_json::to_string(&message) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize progress for {}: {}", entity_key, e);
                return 0;
            }
        };

        let targets = self.subscribers_of(entity_key);
        if targets.is_empty() {
            return 0;
        }

        targets
            .iter()
            .filter(|connection| match connection.send(WsFrame::text(payload.clone())) {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        connection_id = %connection.id(),
                        entity_key = %entity_key,
                        "Failed to deliver progress: {}", e
                    );
                    false
                }
            })
            .count()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn subscriber_count(&self, entity_key: &str) -> usize {
        self.subscriptions
            .get(entity_key)
            .map(|ids| ids.len())
            .unwrap_or(0)
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            connections: self.connections.len(),
            subscribed_entities: self.subscriptions.len(),
            subscriptions: self.subscriptions.iter().map(|e| e.value().len()).sum(),
        }
    }

    fn register(&self, connection: Arc<ClientConnection>) -> Registration<'_> {
        self.connections.insert(connection.id(), connection.clone());
        info!(
            connection_id = %connection.id(),
            user_id = connection.user_id(),
            "WebSocket connection opened"
        );
        Registration {
            hub: self,
            connection,
        }
    }

    /// Index entries go first so the index never points at an unregistered
    /// connection.
    fn unregister(&self, connection: &ClientConnection) {
        for key in connection.drain_subscriptions() {
            self.remove_from_index(&key, connection.id());
        }
        self.connections.remove(&connection.id());
        info!(connection_id = %connection.id(), "WebSocket connection closed");
    }

    fn remove_from_index(&self, entity_key: &str, id: Uuid) {
        if let Some(mut ids) = self.subscriptions.get_mut(entity_key) {
            ids.remove(&id);
        }
        self.subscriptions.remove_if(entity_key, |_, ids| ids.is_empty());
    }

    fn subscribers_of(&self, entity_key: &str) -> Vec<Arc<ClientConnection>> {
        let ids: Vec<Uuid> = self
            .subscriptions
            .get(entity_key)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        ids.iter()
            .filter_map(|id| self.connections.get(id).map(|c| c.value().clone()))
            .collect()
    }

    async fn handle_text(&self, connection: &ClientConnection, text: &str) {
        let message: ClientMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                debug!(connection_id = %connection.id(), "Ignoring malformed message: {}", e);
                return;
            }
        };

        match message {
            ClientMessage::Subscribe { entity_key } => {
                match self.authz.is_owner(connection.user_id(), &entity_key).await {
                    Ok(true) => {
                        if connection.add_subscription(&entity_key) {
                            self.subscriptions
                                .entry(entity_key.clone())
                                .or_default()
                                .insert(connection.id());
                        }
                        debug!(connection_id = %connection.id(), entity_key = %entity_key, "Subscribed");
                    }
                    Ok(false) => warn!(
                        connection_id = %connection.id(),
                        user_id = connection.user_id(),
                        entity_key = %entity_key,
                        "Ignoring subscribe to an entity the user does not own"
                    ),
                    Err(e) => error!(
                        connection_id = %connection.id(),
                        entity_key = %entity_key,
                        "Ownership check failed: {}", e
                    ),
                }
            }
            ClientMessage::Unsubscribe { entity_key } => {
                if connection.remove_subscription(&entity_key) {
                    self.remove_from_index(&entity_key, connection.id());
                }
                debug!(connection_id = %connection.id(), entity_key = %entity_key, "Unsubscribed");
            }
        }
    }
}
