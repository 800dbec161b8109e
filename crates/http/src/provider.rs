//! The request pipeline.

use async_trait::async_trait;
use reqwest::Client;
use tether_core::{AbortProxy, AnyCancel, DataProvider, Error, Meta, Result};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::options::{FetchOptions, HttpProviderOptions};
use crate::query::{HttpQuery, RequestSpec};
use crate::resolve::{Payload, resolve_response};

/// HTTP adapter backing a host-framework resource with a
/// request/response transport.
///
/// The provider holds no mutable state across calls; everything per-call
/// lives in the fresh [`RequestSpec`], the [`Meta`] instance, and the
/// composed cancellation.
#[derive(Clone)]
pub struct HttpProvider {
    options: HttpProviderOptions,
    client: Client,
}

impl HttpProvider {
    /// Create a provider with a default `reqwest` client.
    #[must_use]
    pub fn new(options: HttpProviderOptions) -> Self {
        Self::with_client(Client::new(), options)
    }

    /// Create a provider over a caller-configured client.
    #[must_use]
    pub fn with_client(client: Client, options: HttpProviderOptions) -> Self {
        Self { options, client }
    }

    /// Resolve `location` against the configured base URL, when present.
    pub fn resolve_url(&self, location: &str) -> Result<Url> {
        match &self.options.base_url {
            Some(base) => base.join(location),
            None => Url::parse(location),
        }
        .map_err(|err| Error::location(location, err))
    }

    /// Normalize `location` into a cache-key form: resolved, with query
    /// and fragment stripped. Pure; independent of execution.
    pub fn normalize_location(&self, location: &str) -> Result<String> {
        let mut url = self.resolve_url(location)?;
        url.set_query(None);
        url.set_fragment(None);
        Ok(url.into())
    }

    /// Execute the request pipeline for `location`.
    ///
    /// Steps: resolve the URL, build a fresh descriptor from `query`, run
    /// `modify_request`, perform the exchange raced against the composed
    /// cancellation, then classify the outcome through the layered
    /// fallback chain. A fresh [`Meta`] is created when `meta` is absent
    /// and shared across every hook of this call.
    pub async fn request(
        &self,
        location: &str,
        query: HttpQuery,
        options: Option<FetchOptions>,
        meta: Option<Meta>,
        abort: Option<AbortProxy>,
    ) -> Result<Payload> {
        let options = options.unwrap_or_default();
        let meta = meta.unwrap_or_default();

        // Bridge the external proxy onto this call's own token.
        let call_token = CancellationToken::new();
        if let Some(proxy) = &abort {
            proxy.listen(&call_token);
        }
        let cancel = AnyCancel::new()
            .with(call_token)
            .with_opt(query.abort.clone());

        let mut url = self.resolve_url(location)?;
        if !query.params.is_empty() {
            url.query_pairs_mut().extend_pairs(&query.params);
        }

        let mut spec = RequestSpec::from_query(&query);
        if let Some(hook) = &self.options.modify_request {
            spec = hook(url.clone(), spec, meta.clone())
                .await
                .map_err(Error::hook)?;
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut builder = self
            .client
            .request(spec.method.clone(), url.clone())
            .headers(spec.headers.clone());
        if let Some(body) = &spec.body {
            builder = builder.body(body.clone());
        }

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            sent = builder.send() => sent.map_err(Error::network)?,
        };
        let status = response.status();
        tracing::debug!(%url, status = status.as_u16(), "exchange completed");

        // Hooks and body decoding hold the live response; they race the
        // same composed cancellation as the exchange, so a body that
        // stalls after the status line cannot outlive a fired abort.
        let classify = async {
            if !status.is_success() {
                let handler = [
                    options.handle_error.clone(),
                    self.options.handle_error.clone(),
                ]
                .into_iter()
                .flatten()
                .next();
                if let Some(hook) = handler {
                    return hook(url, spec, response, meta).await.map_err(Error::hook);
                }
                // Non-standard codes have no canonical reason; carry the
                // numeric code so the status text is never empty.
                let status_text = status.canonical_reason().unwrap_or_else(|| status.as_str());
                tracing::warn!(%url, status = status.as_u16(), "unhandled non-success status");
                return Err(Error::status(status.as_u16(), status_text));
            }

            let interpreter = [
                options.get_response.clone(),
                self.options.get_response.clone(),
            ]
            .into_iter()
            .flatten()
            .next();
            if let Some(hook) = interpreter {
                return hook(url, spec, response, meta).await.map_err(Error::hook);
            }

            resolve_response(&options, response).await
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            outcome = classify => outcome,
        }
    }
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("options", &self.options)
            .finish()
    }
}

#[async_trait]
impl DataProvider for HttpProvider {
    type Query = HttpQuery;
    type Options = FetchOptions;
    type Output = Payload;

    async fn handle_get(
        &self,
        key: &str,
        query: HttpQuery,
        options: Option<FetchOptions>,
        meta: Meta,
        abort: AbortProxy,
    ) -> Result<Payload> {
        self.request(key, query, options, Some(meta), Some(abort))
            .await
    }
}
