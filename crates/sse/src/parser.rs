//! Incremental SSE wire-format parser.
//!
//! Feeds on raw body chunks with arbitrary frame boundaries and yields
//! complete events: lines are reconstructed across chunks, CRLF is
//! tolerated, comment lines are ignored, and an event is dispatched on
//! the blank line terminating a non-empty data buffer.

use crate::event::PushEvent;

/// Stateful parser turning body chunks into [`PushEvent`]s.
///
/// One parser instance corresponds to one connection; state carried
/// across [`push`](Self::push) calls is the partial line, the pending
/// event fields, and the last seen event ID.
#[derive(Debug, Default)]
pub struct SseParser {
    partial_line: Vec<u8>,
    event_type: Option<String>,
    data: String,
    id: Option<String>,
    last_event_id: Option<String>,
}

impl SseParser {
    /// Create a parser with empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent `id:` field seen on this connection.
    #[must_use]
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Consume a body chunk, returning every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<PushEvent> {
        let mut completed = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                let line = std::mem::take(&mut self.partial_line);
                let line = String::from_utf8_lossy(&line);
                if let Some(event) = self.process_line(line.trim_end_matches('\r')) {
                    completed.push(event);
                }
            } else {
                self.partial_line.push(byte);
            }
        }
        completed
    }

    /// Handle one complete line; a blank line may finish an event.
    fn process_line(&mut self, line: &str) -> Option<PushEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        // Comment line.
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => {
                if !self.data.is_empty() {
                    self.data.push('\n');
                }
                self.data.push_str(value);
            }
            "event" => self.event_type = Some(value.to_owned()),
            "id" => {
                // IDs containing NUL are ignored per the SSE processing model.
                if !value.contains('\0') {
                    self.id = Some(value.to_owned());
                    self.last_event_id = Some(value.to_owned());
                }
            }
            // `retry` and unknown fields are ignored; reconnection policy
            // belongs to the connection owner.
            _ => {}
        }
        None
    }

    /// Complete the pending event. Empty data buffers dispatch nothing.
    fn dispatch(&mut self) -> Option<PushEvent> {
        let event_type = self.event_type.take();
        let data = std::mem::take(&mut self.data);
        let id = self.id.take();
        if data.is_empty() {
            return None;
        }
        let mut event = PushEvent::new(
            event_type.unwrap_or_else(|| PushEvent::DEFAULT_TYPE.to_owned()),
            data,
        );
        if let Some(id) = id {
            event = event.with_id(id);
        }
        Some(event)
    }
}
