//! Network transport over an SSE endpoint.

use futures::StreamExt;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderValue};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::event::PushEvent;
use crate::parser::SseParser;
use crate::transport::PushTransport;

const CHANNEL_CAPACITY: usize = 64;

/// Push transport backed by a live `text/event-stream` connection.
///
/// The connection is driven by a background task started at
/// construction; parsed events fan out to every attached listener.
/// Dropping the client (or calling [`shutdown`](Self::shutdown)) closes
/// the connection, which in turn closes every listener channel.
pub struct SseClient {
    sender: broadcast::Sender<PushEvent>,
    shutdown: CancellationToken,
}

impl SseClient {
    /// Connect to `url` with a default `reqwest` client.
    #[must_use]
    pub fn connect(url: Url) -> Self {
        Self::connect_with(Client::new(), url)
    }

    /// Connect to `url` over a caller-configured client.
    #[must_use]
    pub fn connect_with(client: Client, url: Url) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let shutdown = CancellationToken::new();
        tokio::spawn(run_connection(
            client,
            url,
            sender.clone(),
            shutdown.clone(),
        ));
        Self { sender, shutdown }
    }

    /// Close the connection. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl PushTransport for SseClient {
    fn listen(&self, _event_type: &str) -> broadcast::Receiver<PushEvent> {
        self.sender.subscribe()
    }
}

impl Drop for SseClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for SseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseClient")
            .field("shut_down", &self.shutdown.is_cancelled())
            .finish()
    }
}

/// Drive one connection to completion: request, stream, parse, fan out.
async fn run_connection(
    client: Client,
    url: Url,
    sender: broadcast::Sender<PushEvent>,
    shutdown: CancellationToken,
) {
    let request = client
        .get(url.clone())
        .header(ACCEPT, HeaderValue::from_static("text/event-stream"));

    let response = tokio::select! {
        biased;
        () = shutdown.cancelled() => return,
        sent = request.send() => match sent {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%url, %error, "event stream connection failed");
                return;
            }
        },
    };
    let status = response.status();
    if !status.is_success() {
        tracing::warn!(%url, status = status.as_u16(), "event stream rejected");
        return;
    }
    tracing::debug!(%url, "event stream connected");

    let mut stream = response.bytes_stream();
    let mut parser = SseParser::new();
    loop {
        let chunk = tokio::select! {
            biased;
            () = shutdown.cancelled() => return,
            next = stream.next() => match next {
                Some(Ok(chunk)) => chunk,
                Some(Err(error)) => {
                    tracing::warn!(%url, %error, "event stream read failed");
                    return;
                }
                None => {
                    tracing::debug!(%url, "event stream ended");
                    return;
                }
            },
        };
        for event in parser.push(&chunk) {
            // A send error only means no listener is attached right now.
            let _ = sender.send(event);
        }
    }
}
