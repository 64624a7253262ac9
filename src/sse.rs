//! Server-sent events wire-format parsing.

use crate::types::SseEvent;

/// Classify a response as an event stream from its `content-type` header.
pub fn is_event_stream_content_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.contains("text/event-stream"))
}

/// Parse one complete event-stream buffer into discrete events.
///
/// Operates on a fully buffered body, not an incremental stream. Comment
/// lines (`:` prefix) and unrecognized fields are skipped; multiple `data`
/// lines within one event are joined with `\n`; a blank line terminates an
/// event. A final event without a trailing blank line is still emitted, since
/// the wire format does not require a trailing terminator.
pub fn parse_sse_buffer(buffer: &str) -> Vec<SseEvent> {
    let mut events = Vec::new();
    let mut pending = PendingEvent::default();

    for line in buffer.split('\n') {
        if line.is_empty() {
            pending.flush_into(&mut events);
            continue;
        }

        if line.starts_with(':') {
            // comment line
            continue;
        }

        let Some(colon) = line.find(':') else {
            // field name with no colon carries nothing we record
            continue;
        };

        let field = &line[..colon];
        let mut value = &line[colon + 1..];
        // The format allows exactly one optional space after the colon;
        // further whitespace is part of the value.
        if let Some(stripped) = value.strip_prefix(' ') {
            value = stripped;
        }

        match field {
            "event" => pending.event_type = Some(value.to_string()),
            "data" => pending.data_lines.push(value.to_string()),
            "id" => pending.id = Some(value.to_string()),
            // "retry" and anything else is recognized but ignored
            _ => {}
        }
    }

    pending.flush_into(&mut events);
    events
}

#[derive(Default)]
struct PendingEvent {
    event_type: Option<String>,
    data_lines: Vec<String>,
    id: Option<String>,
}

impl PendingEvent {
    /// Emit the accumulated event, if any, and reset.
    fn flush_into(&mut self, events: &mut Vec<SseEvent>) {
        if self.data_lines.is_empty() && self.event_type.is_none() {
            return;
        }
        let pending = std::mem::take(self);
        events.push(SseEvent {
            event_type: pending
                .event_type
                .unwrap_or_else(|| "message".to_string()),
            data: pending.data_lines.join("\n"),
            id: pending.id,
        });
    }
}
