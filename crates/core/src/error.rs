//! Error types shared by the tether adapters.

use thiserror::Error;

/// Boxed error used at hook boundaries, where user code supplies the
/// failure type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure vocabulary surfaced to the host framework.
///
/// The only local recovery adapters perform is the layered fallback among
/// per-call handler, instance handler, and default behavior; once that
/// chain is exhausted, one of these variants propagates. Nothing is
/// silently swallowed.
#[derive(Debug, Error)]
pub enum Error {
    /// Network-level failure, or a non-success status that no error
    /// handler resolved. Carries the transport's status text.
    #[error("transport failure: {status_text}")]
    Transport {
        /// HTTP status code, when the exchange completed.
        status: Option<u16>,
        /// Status text (or the network error description).
        status_text: String,
        /// The underlying transport error, when one exists.
        #[source]
        source: Option<BoxError>,
    },

    /// The composed cancellation fired before the exchange completed.
    #[error("operation cancelled")]
    Cancelled,

    /// A user-supplied hook rejected. The hook's own error is preserved
    /// as the source, not rewritten.
    #[error("hook failed: {0}")]
    Hook(#[source] BoxError),

    /// Success status, but no decoding strategy applied.
    #[error("unprocessable response")]
    Unprocessable,

    /// The target location could not be resolved into a URL.
    #[error("invalid location '{location}'")]
    Location {
        /// The location string as supplied by the caller.
        location: String,
        /// The parse failure.
        #[source]
        source: BoxError,
    },

    /// A decoding strategy applied but the payload was malformed.
    /// Malformed structured data is never coerced to text.
    #[error("malformed payload")]
    Decode(#[source] BoxError),
}

impl Error {
    /// Transport failure for a completed exchange with a non-success status.
    pub fn status(status: u16, status_text: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            status_text: status_text.into(),
            source: None,
        }
    }

    /// Transport failure below the status line (connect, TLS, body read).
    pub fn network(source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Self::Transport {
            status: None,
            status_text: source.to_string(),
            source: Some(source),
        }
    }

    /// Hook rejection, preserving the user error unchanged.
    pub fn hook(source: impl Into<BoxError>) -> Self {
        Self::Hook(source.into())
    }

    /// Unresolvable target location.
    pub fn location(location: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Location {
            location: location.into(),
            source: source.into(),
        }
    }

    /// Malformed payload under an applied decoding strategy.
    pub fn decode(source: impl Into<BoxError>) -> Self {
        Self::Decode(source.into())
    }

    /// Whether this failure came from the composed cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
