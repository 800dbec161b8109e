//! Push transports and the hot-swappable transport cell.
//!
//! A [`PushTransport`] is anything that can hand out a stream of
//! [`PushEvent`]s for a named event type. [`TransportCell`] holds the
//! current transport for a receiver and lets the owner replace it while
//! subscriptions stay live: replacement runs each subscription's
//! re-attach callback synchronously, so listeners on the replacement
//! exist before `replace` returns and nothing dispatched afterwards is
//! lost.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::event::PushEvent;

/// Source of server-push events.
///
/// `listen` attaches a listener for `event_type` and returns the channel
/// it will be fed through. Transports are free to ignore the type and
/// deliver their full stream; the receiver filters by type on its side.
pub trait PushTransport: Send + Sync {
    /// Attach a listener for `event_type`.
    fn listen(&self, event_type: &str) -> broadcast::Receiver<PushEvent>;
}

// ---------------------------------------------------------------------------
// ChannelTransport
// ---------------------------------------------------------------------------

/// In-process transport backed by a broadcast channel.
///
/// Useful for tests and for bridging non-network event sources into a
/// receiver. Every listener sees every dispatched event.
#[derive(Debug)]
pub struct ChannelTransport {
    sender: broadcast::Sender<PushEvent>,
}

impl ChannelTransport {
    const DEFAULT_CAPACITY: usize = 64;

    /// Create a transport with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a transport buffering up to `capacity` undelivered events
    /// per listener.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Deliver `event` to every attached listener, returning how many
    /// listeners received it.
    pub fn dispatch(&self, event: PushEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl PushTransport for ChannelTransport {
    fn listen(&self, _event_type: &str) -> broadcast::Receiver<PushEvent> {
        self.sender.subscribe()
    }
}

// ---------------------------------------------------------------------------
// TransportCell
// ---------------------------------------------------------------------------

/// Re-attach callback run synchronously when the transport is swapped.
pub(crate) type SwapCallback = Arc<dyn Fn(Arc<dyn PushTransport>) + Send + Sync>;

struct CellState {
    transport: Arc<dyn PushTransport>,
    watchers: Vec<(u64, SwapCallback)>,
    next_id: u64,
}

/// Shared slot holding the current [`PushTransport`].
///
/// Cloning yields another handle to the same slot. Subscriptions
/// register re-attach callbacks; [`replace`](Self::replace) swaps the
/// slot value and runs them before returning, so a subscription is
/// attached to exactly one transport at every point an outside observer
/// can see.
#[derive(Clone)]
pub struct TransportCell {
    inner: Arc<Mutex<CellState>>,
}

impl TransportCell {
    /// Create a cell holding `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn PushTransport>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CellState {
                transport,
                watchers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Swap in a new transport.
    ///
    /// Re-attach callbacks run synchronously, snapshot-then-dispatch,
    /// with the cell lock released; when `replace` returns, every
    /// registered subscription is listening on the replacement.
    pub fn replace(&self, transport: Arc<dyn PushTransport>) {
        let snapshot = {
            let mut state = self.inner.lock();
            state.transport = Arc::clone(&transport);
            state
                .watchers
                .iter()
                .map(|(_, callback)| Arc::clone(callback))
                .collect::<Vec<_>>()
        };
        for callback in snapshot {
            callback(Arc::clone(&transport));
        }
    }

    /// The transport currently in the slot.
    #[must_use]
    pub fn current(&self) -> Arc<dyn PushTransport> {
        Arc::clone(&self.inner.lock().transport)
    }

    /// Register a re-attach callback and read the current transport in
    /// one step, so no replacement can fall between the two.
    pub(crate) fn attach(&self, callback: SwapCallback) -> (Arc<dyn PushTransport>, WatchGuard) {
        let mut state = self.inner.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.watchers.push((id, callback));
        (
            Arc::clone(&state.transport),
            WatchGuard {
                cell: Arc::downgrade(&self.inner),
                id,
            },
        )
    }
}

impl std::fmt::Debug for TransportCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportCell")
            .field("watchers", &self.inner.lock().watchers.len())
            .finish_non_exhaustive()
    }
}

/// Deregisters its re-attach callback on drop.
pub(crate) struct WatchGuard {
    cell: Weak<Mutex<CellState>>,
    id: u64,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        if let Some(cell) = self.cell.upgrade() {
            cell.lock().watchers.retain(|(id, _)| *id != self.id);
        }
    }
}
