//! Server-push adapter: a subscription state machine over swappable
//! SSE transports.
//!
//! The crate splits into a wire layer and a delivery layer. The wire
//! layer is [`SseParser`] plus [`SseClient`], which turn a
//! `text/event-stream` connection into [`PushEvent`]s. The delivery
//! layer is [`SseReceiver`], which attaches typed listeners to whatever
//! transport currently sits in its [`TransportCell`], follows the cell
//! across hot swaps, and maps raw events into the host's event type
//! before invoking the handler.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tether_core::Notifier;
//! use tether_sse::{PushEvent, SseClient, SseOptions, SseReceiver, TransportCell};
//!
//! # async fn example() {
//! let client = SseClient::connect("https://api.example.com/events".parse().unwrap());
//! let cell = TransportCell::new(Arc::new(client));
//! let receiver: SseReceiver<String, PushEvent> =
//!     SseReceiver::new(cell.clone(), SseOptions::new().events(["update"]));
//!
//! let tracker = Notifier::with_value("resource".to_owned());
//! let teardown = receiver.subscribe(
//!     &tracker,
//!     None,
//!     Arc::new(|batch| println!("{} events", batch.len())),
//! );
//!
//! // Reconnect without disturbing the subscription.
//! cell.replace(Arc::new(SseClient::connect(
//!     "https://api.example.com/events".parse().unwrap(),
//! )));
//!
//! teardown.teardown();
//! # }
//! ```

pub mod client;
pub mod event;
pub mod parser;
pub mod receiver;
pub mod transport;

pub use client::SseClient;
pub use event::PushEvent;
pub use parser::SseParser;
pub use receiver::{GetEventsHook, HookFuture, SseOptions, SseReceiver};
pub use transport::{ChannelTransport, PushTransport, TransportCell};
