//! Cancellation bridge between the host framework and adapter internals.
//!
//! The host hands an [`AbortProxy`] to an adapter call; the adapter attaches
//! its own [`CancellationToken`]s to it. Firing the proxy aborts every
//! attached token exactly once. [`AnyCancel`] composes independent tokens
//! into a single "first source to fire wins" condition.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// AbortProxy
// ---------------------------------------------------------------------------

/// External abort capability for an in-flight operation.
///
/// A single proxy may be attached to multiple internal tokens over its
/// lifetime (as happens across transport hot-swaps). Firing is idempotent:
/// the first [`fire`](Self::fire) cancels all currently attached tokens,
/// later calls are no-ops. Attaching to an already-fired proxy cancels the
/// token immediately.
#[derive(Clone, Default)]
pub struct AbortProxy {
    inner: Arc<Mutex<ProxyState>>,
}

#[derive(Default)]
struct ProxyState {
    fired: bool,
    attached: Vec<CancellationToken>,
}

impl AbortProxy {
    /// Create a proxy with nothing attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an internal token so that firing the proxy cancels it.
    pub fn listen(&self, token: &CancellationToken) {
        let mut state = self.inner.lock();
        if state.fired {
            token.cancel();
        } else {
            state.attached.push(token.clone());
        }
    }

    /// Fire the proxy, aborting every currently attached token.
    ///
    /// Idempotent; double-firing raises no error and cancels nothing twice.
    pub fn fire(&self) {
        let attached = {
            let mut state = self.inner.lock();
            if state.fired {
                return;
            }
            state.fired = true;
            std::mem::take(&mut state.attached)
        };
        tracing::debug!(attached = attached.len(), "abort proxy fired");
        // Cancel outside the lock: token cancellation wakes waiters inline.
        for token in attached {
            token.cancel();
        }
    }

    /// Whether the proxy has fired.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.inner.lock().fired
    }
}

impl std::fmt::Debug for AbortProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("AbortProxy")
            .field("fired", &state.fired)
            .field("attached", &state.attached.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AnyCancel
// ---------------------------------------------------------------------------

/// "Any-of" combinator over cancellation tokens.
///
/// The composed condition fires when any source fires. Each source keeps
/// its own fire-once semantics; composing does not link the sources to each
/// other. An empty combinator never fires.
#[derive(Clone, Default)]
pub struct AnyCancel {
    sources: Vec<CancellationToken>,
}

impl AnyCancel {
    /// Create an empty combinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source token.
    #[must_use]
    pub fn with(mut self, token: CancellationToken) -> Self {
        self.sources.push(token);
        self
    }

    /// Add a source token when present.
    #[must_use]
    pub fn with_opt(self, token: Option<CancellationToken>) -> Self {
        match token {
            Some(token) => self.with(token),
            None => self,
        }
    }

    /// Whether any source has already fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.sources.iter().any(CancellationToken::is_cancelled)
    }

    /// Resolve when the first source fires. Pends forever when empty.
    pub async fn cancelled(&self) {
        if self.sources.is_empty() {
            std::future::pending::<()>().await;
        }
        let waits = self
            .sources
            .iter()
            .map(|token| Box::pin(token.cancelled()))
            .collect::<Vec<_>>();
        futures::future::select_all(waits).await;
    }
}

impl std::fmt::Debug for AnyCancel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyCancel")
            .field("sources", &self.sources.len())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
