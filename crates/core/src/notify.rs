//! Observable single-slot reference cell.
//!
//! [`Notifier`] models "the current resource reference" as an explicit cell
//! scoped to one adapter instance — not an event stream and not ambient
//! global state. Setting the slot notifies subscribers with no payload;
//! subscribers re-read the slot, so they always observe the latest value at
//! dispatch time, never a snapshot captured at subscription time.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

type Callback = Arc<dyn Fn() + Send + Sync>;

struct Inner<T> {
    value: Option<T>,
    subscribers: Vec<(u64, Callback)>,
    next_id: u64,
}

/// Mutable single-slot holder of "current value or absent" with
/// subscription support.
///
/// Cloning yields another handle to the same cell. Notification is
/// synchronous and in subscription order; callbacks run without the
/// internal lock held, so a callback may freely read the slot, subscribe,
/// or unsubscribe.
pub struct Notifier<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for Notifier<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> Default for Notifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

// `Send + 'static` because the unsubscribe closure captures a weak handle
// to the cell and must travel with the `Subscription`.
impl<T: Clone + Send + 'static> Notifier<T> {
    /// Create a cell with an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                value: None,
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Create a cell already holding `value`.
    #[must_use]
    pub fn with_value(value: T) -> Self {
        let cell = Self::new();
        cell.inner.lock().value = Some(value);
        cell
    }

    /// Read the current slot value.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.inner.lock().value.clone()
    }

    /// Store a new value and synchronously notify subscribers.
    pub fn set(&self, value: T) {
        self.store(Some(value));
    }

    /// Empty the slot and synchronously notify subscribers.
    pub fn clear(&self) {
        self.store(None);
    }

    fn store(&self, value: Option<T>) {
        // Snapshot the callback list under the lock, then dispatch without
        // it. A subscriber that unsubscribes mid-notification stays in the
        // current snapshot but receives no future notifications.
        let snapshot = {
            let mut inner = self.inner.lock();
            inner.value = value;
            inner
                .subscribers
                .iter()
                .map(|(_, callback)| Arc::clone(callback))
                .collect::<Vec<_>>()
        };
        for callback in snapshot {
            callback();
        }
    }

    /// Register a subscriber, returning its unsubscribe handle.
    ///
    /// The callback carries no payload; re-read the slot with
    /// [`get`](Self::get) at delivery time.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn() + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push((id, Arc::new(callback)));
            id
        };
        let weak = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || Self::remove(&weak, id))),
        }
    }

    fn remove(weak: &Weak<Mutex<Inner<T>>>, id: u64) {
        if let Some(inner) = weak.upgrade() {
            inner.lock().subscribers.retain(|(sid, _)| *sid != id);
        }
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

impl<T> std::fmt::Debug for Notifier<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Notifier")
            .field("occupied", &inner.value.is_some())
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

/// Unsubscribe handle returned by [`Notifier::subscribe`].
///
/// Unsubscribes on drop; [`unsubscribe`](Self::unsubscribe) makes the
/// intent explicit at call sites.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Remove the subscriber. Later notifications skip it.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn subscribers_reread_slot_at_dispatch_time() {
        let cell = Notifier::<String>::new();
        let seen = Arc::new(PlMutex::new(Vec::new()));

        let reader = cell.clone();
        let seen_c = Arc::clone(&seen);
        let sub = cell.subscribe(move || {
            seen_c.lock().push(reader.get());
        });

        cell.set("a".to_owned());
        cell.set("b".to_owned());
        cell.clear();

        assert_eq!(
            *seen.lock(),
            vec![Some("a".to_owned()), Some("b".to_owned()), None]
        );
        sub.unsubscribe();
    }

    #[test]
    fn notification_order_is_subscription_order() {
        let cell = Notifier::<u32>::new();
        let order = Arc::new(PlMutex::new(Vec::new()));

        let o1 = Arc::clone(&order);
        let s1 = cell.subscribe(move || o1.lock().push("first"));
        let o2 = Arc::clone(&order);
        let s2 = cell.subscribe(move || o2.lock().push("second"));

        cell.set(1);
        assert_eq!(*order.lock(), vec!["first", "second"]);
        drop((s1, s2));
    }

    #[test]
    fn unsubscribe_stops_future_notifications() {
        let cell = Notifier::<u32>::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits_c = Arc::clone(&hits);
        let sub = cell.subscribe(move || {
            hits_c.fetch_add(1, Ordering::SeqCst);
        });

        cell.set(1);
        sub.unsubscribe();
        cell.set(2);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(cell.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_during_notification_spares_scheduled_delivery() {
        let cell = Notifier::<u32>::new();
        let hits = Arc::new(AtomicUsize::new(0));

        // First subscriber unsubscribes the second mid-notification.
        let held: Arc<PlMutex<Option<Subscription>>> = Arc::new(PlMutex::new(None));
        let held_c = Arc::clone(&held);
        let _s1 = cell.subscribe(move || {
            if let Some(sub) = held_c.lock().take() {
                sub.unsubscribe();
            }
        });

        let hits_c = Arc::clone(&hits);
        let s2 = cell.subscribe(move || {
            hits_c.fetch_add(1, Ordering::SeqCst);
        });
        *held.lock() = Some(s2);

        // The second subscriber was already scheduled for this
        // notification, so it still fires once.
        cell.set(1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // It receives nothing afterwards.
        cell.set(2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscription_handle_moves_across_threads() {
        let cell = Notifier::<u32>::new();
        let sub = cell.subscribe(|| {});
        assert_eq!(cell.subscriber_count(), 1);

        let worker = std::thread::spawn(move || drop(sub));
        worker.join().expect("worker thread");
        assert_eq!(cell.subscriber_count(), 0);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let cell = Notifier::<u32>::new();
        {
            let _sub = cell.subscribe(|| {});
            assert_eq!(cell.subscriber_count(), 1);
        }
        assert_eq!(cell.subscriber_count(), 0);
    }
}
