//! Query parameters and the per-invocation request descriptor.

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use tether_core::{Error, Result};
use tokio_util::sync::CancellationToken;

/// Transport-specific request parameters supplied by the host per call.
///
/// Header-like data is merged into a fresh header collection per
/// invocation; the remaining fields are shallow-merged into the request
/// descriptor. An embedded `abort` token joins the composed cancellation
/// for the call.
#[derive(Clone, Default)]
pub struct HttpQuery {
    /// HTTP method; `GET` when unset.
    pub method: Option<Method>,
    /// Headers merged into the per-invocation header collection.
    pub headers: HeaderMap,
    /// Raw request body.
    pub body: Option<Bytes>,
    /// Search parameters appended to the resolved URL.
    pub params: Vec<(String, String)>,
    /// Caller-supplied abort directive; one of the composed cancellation
    /// sources for this call.
    pub abort: Option<CancellationToken>,
}

impl HttpQuery {
    /// Empty query (a plain `GET`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A `GET` query.
    #[must_use]
    pub fn get() -> Self {
        Self::new().method(Method::GET)
    }

    /// A `POST` query.
    #[must_use]
    pub fn post() -> Self {
        Self::new().method(Method::POST)
    }

    /// Set the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set a raw body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a JSON body and the matching `Content-Type` header.
    pub fn json_body<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(value).map_err(Error::decode)?;
        self.headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(Bytes::from(encoded));
        Ok(self)
    }

    /// Append a search parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Attach a caller-owned abort token.
    #[must_use]
    pub fn abort(mut self, token: CancellationToken) -> Self {
        self.abort = Some(token);
        self
    }
}

impl std::fmt::Debug for HttpQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpQuery")
            .field("method", &self.method)
            .field("headers", &self.headers.len())
            .field("body_bytes", &self.body.as_ref().map(Bytes::len))
            .field("params", &self.params.len())
            .field("abortable", &self.abort.is_some())
            .finish()
    }
}

/// Request descriptor built fresh per invocation.
///
/// Passed through `modify_request` before send, then to the response
/// hooks; the pipeline never reuses a descriptor across calls.
#[derive(Clone, Debug)]
pub struct RequestSpec {
    /// HTTP method for the exchange.
    pub method: Method,
    /// Per-invocation header collection; hooks may mutate it.
    pub headers: HeaderMap,
    /// Request body; hooks may replace it.
    pub body: Option<Bytes>,
}

impl RequestSpec {
    pub(crate) fn from_query(query: &HttpQuery) -> Self {
        Self {
            method: query.method.clone().unwrap_or(Method::GET),
            headers: query.headers.clone(),
            body: query.body.clone(),
        }
    }
}
