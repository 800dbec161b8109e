//! # tether-http
//!
//! HTTP adapter backing the host framework's resource abstraction with a
//! request/response transport.
//!
//! [`HttpProvider`] implements the request pipeline: resolve the target
//! location against an optional base URL, build a fresh request descriptor
//! from the query, run the `modify_request` hook, execute the exchange
//! raced against the composed cancellation, then classify the outcome
//! through the layered fallback chain (per-call hook, instance hook,
//! default behavior).
//!
//! ```no_run
//! use tether_core::{AbortProxy, Meta};
//! use tether_http::{HttpProvider, HttpProviderOptions, HttpQuery};
//!
//! # async fn example() -> tether_core::Result<()> {
//! let provider = HttpProvider::new(
//!     HttpProviderOptions::new().base_url("https://api.example.com".parse().unwrap()),
//! );
//! let payload = provider
//!     .request("/items", HttpQuery::get(), None, None, Some(AbortProxy::new()))
//!     .await?;
//! # let _ = payload; Ok(())
//! # }
//! ```

pub mod options;
pub mod provider;
pub mod query;
pub mod resolve;

pub use options::{
    FetchOptions, GetResponseHook, HandleErrorHook, HookFuture, HttpProviderOptions,
    ModifyRequestHook,
};
pub use provider::HttpProvider;
pub use query::{HttpQuery, RequestSpec};
pub use resolve::Payload;
