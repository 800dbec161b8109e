//! Host-framework entry points implemented by transport adapters.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::abort::AbortProxy;
use crate::error::Result;
use crate::meta::Meta;
use crate::notify::Notifier;

/// Handler the host supplies to receive mapped event batches.
///
/// A single transport event may fan out to zero or more logical events,
/// so the handler always receives a sequence.
pub type EventHandler<E> = Arc<dyn Fn(Vec<E>) + Send + Sync>;

/// Request/response-backed resource provider.
///
/// The host framework calls [`handle_get`](Self::handle_get) to satisfy a
/// resource fetch. The adapter holds no mutable state across calls beyond
/// its instance configuration.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Transport-specific request parameters.
    type Query: Send;
    /// Per-call options (hooks, decoding flags).
    type Options: Send + Sync;
    /// The typed result handed back to the host.
    type Output: Send;

    /// Satisfy a resource fetch for `key`.
    ///
    /// `meta` is threaded unchanged through every hook of this call;
    /// firing `abort` fails the call with [`crate::Error::Cancelled`]
    /// rather than hanging.
    async fn handle_get(
        &self,
        key: &str,
        query: Self::Query,
        options: Option<Self::Options>,
        meta: Meta,
        abort: AbortProxy,
    ) -> Result<Self::Output>;
}

/// Push-backed event receiver.
///
/// The host supplies the resource tracker and a handler; the adapter
/// attaches listeners to its current push transport and delivers mapped
/// events until the returned [`Teardown`] fires.
pub trait EventReceiver: Send + Sync {
    /// The host's resource representation, read at dispatch time.
    type Resource: Clone + Send + Sync + 'static;
    /// Per-subscription options (event-type set, mapping hook).
    type Options;
    /// The mapped event type delivered to the handler.
    type Event: Send + 'static;

    /// Start event-driven delivery for the tracked resource.
    fn handle_subscribe(
        &self,
        tracker: &Notifier<Self::Resource>,
        options: Option<Self::Options>,
        handler: EventHandler<Self::Event>,
    ) -> Teardown;
}

/// Teardown action for an active subscription.
///
/// Firing it moves the subscription to its terminal state: listeners
/// detach, the resource-tracker subscription is released, and no handler
/// invocation happens afterwards — including after a later transport
/// swap. Idempotent; there is no transition back.
#[derive(Clone)]
pub struct Teardown {
    scope: CancellationToken,
}

impl Teardown {
    /// Wrap the subscription's outer cancellation scope.
    #[must_use]
    pub fn new(scope: CancellationToken) -> Self {
        Self { scope }
    }

    /// Tear the subscription down.
    pub fn teardown(&self) {
        self.scope.cancel();
    }

    /// Whether teardown has fired.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.scope.is_cancelled()
    }
}

impl std::fmt::Debug for Teardown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Teardown")
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}
