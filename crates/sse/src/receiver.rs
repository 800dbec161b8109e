//! The subscription state machine.
//!
//! [`SseReceiver`] turns raw transport events into typed event batches
//! for the host. A subscription attaches one listener task per requested
//! event type to the current transport; a re-attach callback registered
//! with the [`TransportCell`] follows it across hot swaps, and the
//! subscription's [`Teardown`] stops everything. Listener generations
//! are child cancellation scopes of the subscription scope, so teardown
//! always covers the active generation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use tether_core::{BoxError, EventHandler, EventReceiver, Notifier, Teardown};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::event::PushEvent;
use crate::transport::{PushTransport, SwapCallback, TransportCell};

/// Boxed future returned by the event-mapping hook.
pub type HookFuture<T> = Pin<Box<dyn Future<Output = Result<T, BoxError>> + Send>>;

/// Maps one raw transport event into a batch of logical events.
///
/// Receives the tracked resource as it stands at dispatch time, the
/// event type the listener was attached for, and the raw event. An empty
/// batch is a valid outcome and still reaches the handler.
pub type GetEventsHook<R, E> =
    Arc<dyn Fn(Option<R>, String, PushEvent) -> HookFuture<Vec<E>> + Send + Sync>;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Subscription configuration, applied at the instance or the
/// per-subscription level.
///
/// Per-subscription settings take precedence field by field: a
/// subscription that names an event-type set or a mapping hook overrides
/// the instance one, and falls back to it otherwise.
pub struct SseOptions<R, E> {
    /// Event types to listen for. `None` falls through to the next
    /// level; an explicitly empty set means the default `"message"`
    /// type only.
    pub events: Option<Vec<String>>,
    /// Hook mapping raw events into logical event batches.
    pub get_events: Option<GetEventsHook<R, E>>,
}

impl<R, E> SseOptions<R, E> {
    /// Options with every field deferring to the next level.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: None,
            get_events: None,
        }
    }

    /// Set the event types to listen for.
    #[must_use]
    pub fn events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events = Some(events.into_iter().map(Into::into).collect());
        self
    }

    /// Install the event-mapping hook.
    #[must_use]
    pub fn on_event<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Option<R>, String, PushEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<E>, BoxError>> + Send + 'static,
    {
        self.get_events = Some(Arc::new(move |resource, event_type, event| {
            Box::pin(hook(resource, event_type, event))
        }));
        self
    }
}

impl<R, E> Default for SseOptions<R, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, E> Clone for SseOptions<R, E> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            get_events: self.get_events.clone(),
        }
    }
}

impl<R, E> std::fmt::Debug for SseOptions<R, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseOptions")
            .field("events", &self.events)
            .field("has_get_events", &self.get_events.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Receiver
// ---------------------------------------------------------------------------

/// Push adapter delivering typed event batches from a swappable
/// transport.
///
/// The receiver itself is passive configuration plus a transport slot;
/// all per-subscription state lives in the tasks spawned by
/// [`subscribe`](Self::subscribe).
pub struct SseReceiver<R, E> {
    transport: TransportCell,
    options: SseOptions<R, E>,
}

impl<R, E> SseReceiver<R, E>
where
    R: Clone + Send + Sync + 'static,
    E: From<PushEvent> + Send + 'static,
{
    /// Create a receiver over `transport`.
    #[must_use]
    pub fn new(transport: TransportCell, options: SseOptions<R, E>) -> Self {
        Self { transport, options }
    }

    /// Handle to the transport slot, for hot-swapping the connection.
    #[must_use]
    pub fn transport(&self) -> TransportCell {
        self.transport.clone()
    }

    /// Start event-driven delivery for the resource tracked by
    /// `tracker`.
    ///
    /// Listeners attach to the transport in the slot before this call
    /// returns and follow it across swaps: the re-attach runs inside
    /// [`TransportCell::replace`], new listeners first, outgoing
    /// generation cancelled after, so the subscription is never attached
    /// to nothing. Delivery reads the tracker at dispatch time, so
    /// handlers always see the current resource, never the one captured
    /// at subscription time. The returned [`Teardown`] is the only exit:
    /// firing it detaches every listener, releases the tracker
    /// subscription, and suppresses all later invocations.
    ///
    /// Must be called from within a tokio runtime; listener tasks spawn
    /// on the caller's runtime.
    pub fn subscribe(
        &self,
        tracker: &Notifier<R>,
        options: Option<SseOptions<R, E>>,
        handler: EventHandler<E>,
    ) -> Teardown {
        let types = resolve_event_types(
            options.as_ref().and_then(|o| o.events.clone()),
            self.options.events.clone(),
        );
        let hook = options
            .and_then(|o| o.get_events)
            .or_else(|| self.options.get_events.clone());

        // Mirror the tracked resource into a slot the listener tasks can
        // read synchronously at dispatch time.
        let slot = Arc::new(Mutex::new(tracker.get()));
        let mirror = tracker.clone();
        let slot_writer = Arc::clone(&slot);
        let tracker_sub = tracker.subscribe(move || {
            *slot_writer.lock() = mirror.get();
        });

        let outer = CancellationToken::new();
        let teardown = Teardown::new(outer.clone());
        let runtime = tokio::runtime::Handle::current();

        // Generations are child tokens of the subscription scope: a swap
        // cancels only the current generation, teardown cancels them all.
        let generation = Arc::new(Mutex::new(outer.child_token()));

        let swap: SwapCallback = {
            let types = types.clone();
            let slot = Arc::clone(&slot);
            let hook = hook.clone();
            let handler = Arc::clone(&handler);
            let runtime = runtime.clone();
            let outer = outer.clone();
            let generation = Arc::clone(&generation);
            Arc::new(move |next: Arc<dyn PushTransport>| {
                if outer.is_cancelled() {
                    return;
                }
                // New listeners first, then cancel the outgoing
                // generation.
                let fresh = outer.child_token();
                attach_generation(&next, &types, &fresh, &slot, &hook, &handler, &runtime);
                let previous = std::mem::replace(&mut *generation.lock(), fresh);
                previous.cancel();
                tracing::debug!("transport swapped, listeners re-attached");
            })
        };

        // Registration and the initial read are one atomic step, so a
        // replacement never falls between them.
        let (current, watch_guard) = self.transport.attach(swap);
        let initial = generation.lock().clone();
        attach_generation(&current, &types, &initial, &slot, &hook, &handler, &runtime);

        // Holds the tracker subscription and the cell registration until
        // teardown releases both.
        tokio::spawn(async move {
            let _tracker_sub = tracker_sub;
            let _watch_guard = watch_guard;
            outer.cancelled().await;
        });

        teardown
    }
}

impl<R, E> std::fmt::Debug for SseReceiver<R, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseReceiver")
            .field("options", &self.options)
            .finish()
    }
}

impl<R, E> EventReceiver for SseReceiver<R, E>
where
    R: Clone + Send + Sync + 'static,
    E: From<PushEvent> + Send + 'static,
{
    type Resource = R;
    type Options = SseOptions<R, E>;
    type Event = E;

    fn handle_subscribe(
        &self,
        tracker: &Notifier<R>,
        options: Option<SseOptions<R, E>>,
        handler: EventHandler<E>,
    ) -> Teardown {
        self.subscribe(tracker, options, handler)
    }
}

/// Per-subscription set wins when present; an empty set collapses to the
/// default `"message"` type instead of falling through.
fn resolve_event_types(
    per_subscription: Option<Vec<String>>,
    instance: Option<Vec<String>>,
) -> Vec<String> {
    match per_subscription.or(instance) {
        Some(types) if !types.is_empty() => types,
        _ => vec![PushEvent::DEFAULT_TYPE.to_owned()],
    }
}

/// Attach one listener task per event type, all scoped to `generation`.
fn attach_generation<R, E>(
    transport: &Arc<dyn PushTransport>,
    types: &[String],
    generation: &CancellationToken,
    slot: &Arc<Mutex<Option<R>>>,
    hook: &Option<GetEventsHook<R, E>>,
    handler: &EventHandler<E>,
    runtime: &tokio::runtime::Handle,
) where
    R: Clone + Send + Sync + 'static,
    E: From<PushEvent> + Send + 'static,
{
    for event_type in types {
        let receiver = transport.listen(event_type);
        runtime.spawn(run_listener(
            receiver,
            event_type.clone(),
            generation.clone(),
            Arc::clone(slot),
            hook.clone(),
            Arc::clone(handler),
        ));
    }
}

/// Deliver events of `event_type` until the generation is cancelled or
/// the channel closes.
async fn run_listener<R, E>(
    mut receiver: broadcast::Receiver<PushEvent>,
    event_type: String,
    generation: CancellationToken,
    slot: Arc<Mutex<Option<R>>>,
    hook: Option<GetEventsHook<R, E>>,
    handler: EventHandler<E>,
) where
    R: Clone + Send + Sync + 'static,
    E: From<PushEvent> + Send + 'static,
{
    loop {
        let event = tokio::select! {
            biased;
            () = generation.cancelled() => return,
            received = receiver.recv() => match received {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(event_type, skipped, "listener lagged, events lost");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
        };
        if event.event_type != event_type {
            continue;
        }

        let resource = slot.lock().clone();
        let batch = match &hook {
            Some(hook) => match hook(resource, event_type.clone(), event).await {
                Ok(batch) => batch,
                Err(error) => {
                    tracing::warn!(event_type, %error, "event mapping failed, event dropped");
                    continue;
                }
            },
            None => vec![E::from(event)],
        };
        // Empty batches still reach the handler; the mapping decided
        // there was nothing logical in this event, which the host may
        // want to observe.
        handler(batch);
    }
}
