//! Per-connection outbound delivery: a bounded, loss-tolerant queue.
//!
//! Every connection owns one queue. Producers ([`ClientHandle`]) never
//! block and never fail: when the queue is full the oldest pending frame
//! is evicted to admit the newest. The connection's writer task drains
//! the other end ([`OutboundReceiver`]) into the socket.
//!
//! The [`ClientHandle`] doubles as a unit's delivery address: the lobby
//! and every game session hold clones of it instead of touching the
//! socket themselves.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;
use voltgrid_protocol::{Codec, Envelope, JsonCodec, PlayerId};

/// Default outbound buffer capacity per connection.
pub const OUTBOUND_CAPACITY: usize = 256;

struct Inner {
    buf: VecDeque<String>,
    closed: bool,
    dropped: u64,
}

struct Shared {
    inner: Mutex<Inner>,
    capacity: usize,
    notify: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a holder panicked mid-push; the
        // queue contents are still a valid VecDeque.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Creates a bounded outbound queue for one connection.
///
/// Returns the producer half (cloneable, used as the player's delivery
/// address) and the consumer half (owned by the connection's writer task).
pub fn outbound_channel(
    player_id: PlayerId,
    capacity: usize,
) -> (ClientHandle, OutboundReceiver) {
    let shared = Arc::new(Shared {
        inner: Mutex::new(Inner {
            buf: VecDeque::with_capacity(capacity),
            closed: false,
            dropped: 0,
        }),
        capacity,
        notify: Notify::new(),
    });
    (
        ClientHandle {
            player_id,
            shared: Arc::clone(&shared),
            codec: JsonCodec,
        },
        OutboundReceiver { shared },
    )
}

/// A player's delivery address: serializes envelopes into the outbound
/// queue. Cheap to clone; sending never blocks.
#[derive(Clone)]
pub struct ClientHandle {
    player_id: PlayerId,
    shared: Arc<Shared>,
    codec: JsonCodec,
}

impl ClientHandle {
    /// The player this handle delivers to.
    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    /// Serializes and enqueues one envelope. Serialization failures are
    /// logged and suppressed; they never abort the caller's broadcast.
    pub fn send(&self, envelope: &Envelope) {
        match self.codec.encode(envelope) {
            Ok(text) => self.push_text(text),
            Err(e) => {
                tracing::error!(
                    player_id = %self.player_id,
                    kind = %envelope.kind,
                    error = %e,
                    "failed to serialize outbound envelope"
                );
            }
        }
    }

    /// Enqueues a pre-encoded frame, evicting the oldest pending frame
    /// when the queue is full. No-op after close.
    pub fn push_text(&self, text: String) {
        {
            let mut inner = self.shared.lock();
            if inner.closed {
                return;
            }
            if inner.buf.len() >= self.shared.capacity {
                inner.buf.pop_front();
                inner.dropped += 1;
                tracing::debug!(
                    player_id = %self.player_id,
                    dropped = inner.dropped,
                    "outbound queue full, evicted oldest frame"
                );
            }
            inner.buf.push_back(text);
        }
        self.shared.notify.notify_one();
    }

    /// Closes the queue. Already-buffered frames still drain; further
    /// pushes are discarded.
    pub fn close(&self) {
        self.shared.lock().closed = true;
        self.shared.notify.notify_one();
    }
}

/// Consumer half of the outbound queue, drained by the writer task.
pub struct OutboundReceiver {
    shared: Arc<Shared>,
}

impl OutboundReceiver {
    /// Waits for the next frame. Returns `None` once the queue is closed
    /// and fully drained.
    pub async fn recv(&self) -> Option<String> {
        loop {
            let notified = self.shared.notify.notified();
            {
                let mut inner = self.shared.lock();
                if let Some(text) = inner.buf.pop_front() {
                    return Some(text);
                }
                if inner.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Pops the next frame without waiting.
    pub fn try_recv(&self) -> Option<String> {
        self.shared.lock().buf.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltgrid_protocol::MessageType;

    fn channel(capacity: usize) -> (ClientHandle, OutboundReceiver) {
        outbound_channel(PlayerId("p-test".into()), capacity)
    }

    #[test]
    fn test_push_and_try_recv_in_order() {
        let (tx, rx) = channel(4);
        tx.push_text("a".into());
        tx.push_text("b".into());
        assert_eq!(rx.try_recv().as_deref(), Some("a"));
        assert_eq!(rx.try_recv().as_deref(), Some("b"));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_full_queue_evicts_oldest_and_admits_newest() {
        let (tx, rx) = channel(3);
        for text in ["1", "2", "3", "4", "5"] {
            tx.push_text(text.into());
        }
        // "1" and "2" were evicted; the newest always made it in.
        assert_eq!(rx.try_recv().as_deref(), Some("3"));
        assert_eq!(rx.try_recv().as_deref(), Some("4"));
        assert_eq!(rx.try_recv().as_deref(), Some("5"));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_push_after_close_is_discarded() {
        let (tx, rx) = channel(4);
        tx.push_text("kept".into());
        tx.close();
        tx.push_text("lost".into());
        assert_eq!(rx.try_recv().as_deref(), Some("kept"));
        assert_eq!(rx.try_recv(), None);
    }

    #[tokio::test]
    async fn test_recv_drains_then_reports_closed() {
        let (tx, rx) = channel(4);
        tx.push_text("last".into());
        tx.close();
        assert_eq!(rx.recv().await.as_deref(), Some("last"));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_recv_wakes_on_push() {
        let (tx, rx) = channel(4);
        let waiter = tokio::spawn(async move { rx.recv().await });
        tokio::task::yield_now().await;
        tx.push_text("ping".into());
        let received = waiter.await.expect("recv task");
        assert_eq!(received.as_deref(), Some("ping"));
    }

    #[test]
    fn test_send_encodes_envelope() {
        let (tx, rx) = channel(4);
        tx.send(&Envelope::bare(MessageType::Pong));
        assert_eq!(rx.try_recv().as_deref(), Some(r#"{"type":"PONG"}"#));
    }
}
