use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::models::{ErrorMessage, SendMessage, SessionError};

/// Messages a connection may have queued but not yet written before it is
/// considered stalled.
pub const OUTBOX_CAPACITY: usize = 256;

/// Item queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message(SendMessage),
    /// Transport-level liveness probe.
    Ping,
}

#[derive(Debug, Default)]
struct Stall {
    flagged: AtomicBool,
    notify: Notify,
}

/// Sending half of a connection's outbound queue.
///
/// Everything queued on one outbox is written to the socket in queue
/// order by a single writer task. Queuing never waits: once the queue is
/// full the outbox is marked stalled, further items are dropped and the
/// connection's stall signal fires.
#[derive(Debug, Clone)]
pub struct Outbox {
    connection_id: String,
    tx: mpsc::Sender<Outbound>,
    stall: Arc<Stall>,
}

impl Outbox {
    pub fn channel(connection_id: &str) -> (Self, mpsc::Receiver<Outbound>) {
        Self::with_capacity(connection_id, OUTBOX_CAPACITY)
    }

    pub fn with_capacity(connection_id: &str, capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity);
        let outbox = Self {
            connection_id: connection_id.to_string(),
            tx,
            stall: Arc::new(Stall::default()),
        };
        (outbox, rx)
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Queue a message. Returns false when it was not queued because the
    /// writer is gone or the queue is full.
    pub fn send(&self, msg: SendMessage) -> bool {
        self.push(Outbound::Message(msg))
    }

    pub fn ping(&self) -> bool {
        self.push(Outbound::Ping)
    }

    /// Report an error to this connection only.
    pub fn report(&self, err: &SessionError) -> bool {
        self.send(SendMessage::Error(ErrorMessage {
            kind: err.kind(),
            message: err.to_string(),
        }))
    }

    /// Whether the queue has overflowed at least once.
    pub fn is_stalled(&self) -> bool {
        self.stall.flagged.load(Ordering::SeqCst)
    }

    /// Resolves once the queue has overflowed, immediately if it already has.
    pub async fn stalled(&self) {
        let notified = self.stall.notify.notified();
        if self.is_stalled() {
            return;
        }
        notified.await;
    }

    fn push(&self, item: Outbound) -> bool {
        if self.is_stalled() {
            return false;
        }
        match self.tx.try_send(item) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue of connection {} is full, marking it stalled", self.connection_id);
                self.stall.flagged.store(true, Ordering::SeqCst);
                self.stall.notify.notify_waiters();
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Dropping outbound message for closed connection {}", self.connection_id);
                false
            }
        }
    }
}
