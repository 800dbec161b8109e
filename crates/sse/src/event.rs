//! The raw server-push event.

/// A single named event delivered by a push transport.
///
/// Fields follow standard SSE semantics: `event_type` defaults to the
/// sentinel `"message"` when the server names none, `data` may span
/// multiple lines, and `id` carries the server's reconnection marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    /// Named event type.
    pub event_type: String,
    /// Textual payload.
    pub data: String,
    /// Server-assigned event ID, when supplied.
    pub id: Option<String>,
}

impl PushEvent {
    /// Sentinel type used when the transport names no event type.
    pub const DEFAULT_TYPE: &'static str = "message";

    /// Create an event of the given type.
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: data.into(),
            id: None,
        }
    }

    /// Create a sentinel-typed (`"message"`) event.
    #[must_use]
    pub fn message(data: impl Into<String>) -> Self {
        Self::new(Self::DEFAULT_TYPE, data)
    }

    /// Attach the server-assigned event ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}
