//! Instance-level and per-call configuration for [`HttpProvider`].
//!
//! Hooks are pure-or-async functions the host or user supplies. Per-call
//! hooks take priority over instance-level ones; the call site builds the
//! ordered list `[per_call, instance]` and takes the first present — no
//! merging, no chaining.
//!
//! [`HttpProvider`]: crate::provider::HttpProvider

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use reqwest::Response;
use tether_core::{BoxError, Meta};
use url::Url;

use crate::query::RequestSpec;
use crate::resolve::Payload;

/// Boxed future returned by user-supplied hooks.
pub type HookFuture<T> = Pin<Box<dyn Future<Output = Result<T, BoxError>> + Send>>;

/// Reshapes the request descriptor before send; the returned descriptor
/// is the one sent. Failure propagates as the call's failure.
pub type ModifyRequestHook =
    Arc<dyn Fn(Url, RequestSpec, Meta) -> HookFuture<RequestSpec> + Send + Sync>;

/// Turns a successful exchange into the call's result.
pub type GetResponseHook =
    Arc<dyn Fn(Url, RequestSpec, Response, Meta) -> HookFuture<Payload> + Send + Sync>;

/// Recovers from a non-success exchange; its return value becomes the
/// call's result.
pub type HandleErrorHook =
    Arc<dyn Fn(Url, RequestSpec, Response, Meta) -> HookFuture<Payload> + Send + Sync>;

// ---------------------------------------------------------------------------
// HttpProviderOptions
// ---------------------------------------------------------------------------

/// Constructor-level configuration for the HTTP adapter.
#[derive(Clone, Default)]
pub struct HttpProviderOptions {
    /// Relative target locations resolve against this.
    pub base_url: Option<Url>,
    /// Instance-level request mutation hook.
    pub modify_request: Option<ModifyRequestHook>,
    /// Instance-level fallback for interpreting successful exchanges.
    pub get_response: Option<GetResponseHook>,
    /// Instance-level fallback for recovering from failed exchanges.
    pub handle_error: Option<HandleErrorHook>,
}

impl HttpProviderOptions {
    /// Empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative target locations against `base`.
    #[must_use]
    pub fn base_url(mut self, base: Url) -> Self {
        self.base_url = Some(base);
        self
    }

    /// Install the request mutation hook.
    #[must_use]
    pub fn on_request<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Url, RequestSpec, Meta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RequestSpec, BoxError>> + Send + 'static,
    {
        self.modify_request = Some(Arc::new(move |url, spec, meta| {
            Box::pin(hook(url, spec, meta))
        }));
        self
    }

    /// Install the instance-level success hook.
    #[must_use]
    pub fn on_response<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Url, RequestSpec, Response, Meta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, BoxError>> + Send + 'static,
    {
        self.get_response = Some(Arc::new(move |url, spec, response, meta| {
            Box::pin(hook(url, spec, response, meta))
        }));
        self
    }

    /// Install the instance-level error hook.
    #[must_use]
    pub fn on_error<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Url, RequestSpec, Response, Meta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, BoxError>> + Send + 'static,
    {
        self.handle_error = Some(Arc::new(move |url, spec, response, meta| {
            Box::pin(hook(url, spec, response, meta))
        }));
        self
    }
}

impl std::fmt::Debug for HttpProviderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProviderOptions")
            .field("base_url", &self.base_url)
            .field("modify_request", &self.modify_request.is_some())
            .field("get_response", &self.get_response.is_some())
            .field("handle_error", &self.handle_error.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// FetchOptions
// ---------------------------------------------------------------------------

/// Per-call options: decoding flags and call-scoped hooks.
///
/// Flag precedence in the response resolver: explicit `json` wins, the
/// content-kind default follows unless `no_json` suppresses it, and
/// `no_text` is checked last as the escape hatch from text decoding.
#[derive(Clone, Default)]
pub struct FetchOptions {
    /// Force structured decoding regardless of the declared content kind.
    pub json: bool,
    /// Suppress content-kind-driven structured decoding.
    pub no_json: bool,
    /// Suppress the raw-text fallback.
    pub no_text: bool,
    /// Call-scoped success hook; takes priority over the instance hook.
    pub get_response: Option<GetResponseHook>,
    /// Call-scoped error hook; takes priority over the instance hook.
    pub handle_error: Option<HandleErrorHook>,
}

impl FetchOptions {
    /// Default flags, no hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Force structured decoding.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Suppress content-kind-driven structured decoding.
    #[must_use]
    pub fn no_json(mut self) -> Self {
        self.no_json = true;
        self
    }

    /// Suppress the raw-text fallback.
    #[must_use]
    pub fn no_text(mut self) -> Self {
        self.no_text = true;
        self
    }

    /// Install a call-scoped success hook.
    #[must_use]
    pub fn on_response<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Url, RequestSpec, Response, Meta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, BoxError>> + Send + 'static,
    {
        self.get_response = Some(Arc::new(move |url, spec, response, meta| {
            Box::pin(hook(url, spec, response, meta))
        }));
        self
    }

    /// Install a call-scoped error hook.
    #[must_use]
    pub fn on_error<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Url, RequestSpec, Response, Meta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, BoxError>> + Send + 'static,
    {
        self.handle_error = Some(Arc::new(move |url, spec, response, meta| {
            Box::pin(hook(url, spec, response, meta))
        }));
        self
    }
}

impl std::fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOptions")
            .field("json", &self.json)
            .field("no_json", &self.no_json)
            .field("no_text", &self.no_text)
            .field("get_response", &self.get_response.is_some())
            .field("handle_error", &self.handle_error.is_some())
            .finish()
    }
}
