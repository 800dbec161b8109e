//! # tether-core
//!
//! Shared contracts between a host data-orchestration framework and the
//! tether transport adapters.
//!
//! The host framework owns resource caching, request deduplication, and
//! render-triggering; adapters only speak transport. This crate defines the
//! seam between the two:
//!
//! - [`DataProvider`] / [`EventReceiver`] — the entry points the host calls
//!   to satisfy a resource fetch or to start event-driven delivery.
//! - [`AbortProxy`] / [`AnyCancel`] — the cancellation bridge composing an
//!   externally owned abort capability with adapter-internal tokens.
//! - [`Notifier`] — the observable single-slot cell holding "the current
//!   resource", fed by the host and read by the push adapter.
//! - [`Meta`] — the opaque per-request context threaded through every hook
//!   of one logical call.
//! - [`Error`] — the failure vocabulary adapters surface to the host.
//!
//! Library code emits `tracing` events and never installs a global
//! subscriber; binaries and tests own that.

pub mod abort;
pub mod error;
pub mod meta;
pub mod notify;
pub mod provider;

pub use abort::{AbortProxy, AnyCancel};
pub use error::{BoxError, Error, Result};
pub use meta::Meta;
pub use notify::{Notifier, Subscription};
pub use provider::{DataProvider, EventHandler, EventReceiver, Teardown};
