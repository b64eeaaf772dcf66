//! One accepted client connection.
//!
//! Outbound frames go through a bounded queue drained by a per-connection
//! writer task, so a client that stops reading only ever stalls itself.

use std::collections::HashSet;
use std::fmt::Display;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use futures::{Sink, SinkExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::HubError;
use crate::frame::WsFrame;

/// Boxed outbound half of a transport.
pub type FrameSink = Pin<Box<dyn Sink<WsFrame, Error = HubError> + Send>>;

/// Box any frame sink, mapping its error into [`HubError::Transport`].
pub fn boxed_sink<S, E>(sink: S) -> FrameSink
where
    S: Sink<WsFrame, Error = E> + Send + 'static,
    E: Display,
{
    Box::pin(sink.sink_map_err(|e| HubError::Transport(e.to_string())))
}

/// A live client. Frames are queued in call order and written by one task.
pub struct ClientConnection {
    id: Uuid,
    user_id: String,
    outbound: Mutex<Option<mpsc::Sender<WsFrame>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    /// Cancelled once the connection can no longer deliver frames.
    dead: CancellationToken,
    send_timeout: Duration,
    subscriptions: Mutex<HashSet<String>>,
}

impl ClientConnection {
    /// Must be called inside a Tokio runtime; spawns the writer task.
    pub fn new(
        user_id: impl Into<String>,
        sink: FrameSink,
        queue_capacity: usize,
        send_timeout: Duration,
    ) -> Self {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let dead = CancellationToken::new();
        let writer = tokio::spawn(write_frames(id, sink, rx, dead.clone(), send_timeout));
        Self {
            id,
            user_id: user_id.into(),
            outbound: Mutex::new(Some(tx)),
            writer: Mutex::new(Some(writer)),
            dead,
            send_timeout,
            subscriptions: Mutex::new(HashSet::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Queue one frame without waiting. A full queue means the client has
    /// stopped reading; the connection is marked dead and the frame dropped.
    pub fn send(&self, frame: WsFrame) -> Result<(), HubError> {
        let sender = lock(&self.outbound).clone();
        let Some(sender) = sender else {
            return Err(HubError::Closed);
        };
        match sender.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dead.cancel();
                Err(HubError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(HubError::Closed),
        }
    }

    /// Resolves once the writer gave up or the queue overflowed.
    pub async fn dead(&self) {
        self.dead.cancelled().await
    }

    pub fn is_dead(&self) -> bool {
        self.dead.is_cancelled()
    }

    /// Stop accepting frames, let the writer flush what is queued, then close
    /// the sink. Bounded by the send timeout even if the client never reads.
    pub async fn close(&self) {
        drop(lock(&self.outbound).take());
        let writer = lock(&self.writer).take();
        let Some(mut writer) = writer else {
            return;
        };
        // Flush plus close, each bounded inside the writer.
        if timeout(self.send_timeout * 2, &mut writer).await.is_err() {
            debug!(connection_id = %self.id, "Writer did not finish in time, aborting");
            writer.abort();
        }
    }

    fn lock_subscriptions(&self) -> MutexGuard<'_, HashSet<String>> {
        lock(&self.subscriptions)
    }

    /// Returns true if the key was not subscribed before.
    pub(crate) fn add_subscription(&self, entity_key: &str) -> bool {
        self.lock_subscriptions().insert(entity_key.to_string())
    }

    pub(crate) fn remove_subscription(&self, entity_key: &str) -> bool {
        self.lock_subscriptions().remove(entity_key)
    }

    /// Take every subscribed key, leaving the set empty.
    pub(crate) fn drain_subscriptions(&self) -> Vec<String> {
        self.lock_subscriptions().drain().collect()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock_subscriptions().iter().cloned().collect();
        keys.sort();
        keys
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("Connection state lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

async fn write_frames(
    id: Uuid,
    mut sink: FrameSink,
    mut queue: mpsc::Receiver<WsFrame>,
    dead: CancellationToken,
    send_timeout: Duration,
) {
    loop {
        let frame = tokio::select! {
            biased;
            _ = dead.cancelled() => break,
            frame = queue.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        let result = tokio::select! {
            biased;
            _ = dead.cancelled() => break,
            result = timeout(send_timeout, sink.send(frame)) => result,
        };
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(connection_id = %id, "Send failed: {}", e);
                dead.cancel();
                break;
            }
            Err(_) => {
                warn!(connection_id = %id, "Send timed out after {:?}", send_timeout);
                dead.cancel();
                break;
            }
        }
    }

    match timeout(send_timeout, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(connection_id = %id, "Failed to close connection sink: {}", e),
        Err(_) => debug!(connection_id = %id, "Closing connection sink timed out"),
    }
}
