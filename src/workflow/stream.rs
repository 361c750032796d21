//! Incremental decoding of the agent's newline-delimited JSON output.

use serde_json::Value;

/// One decoded item from the agent's stdout stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A complete line that parsed as JSON
    Json(Value),

    /// A complete line that is not valid JSON, passed through verbatim
    Raw(String),
}

/// Incremental newline-delimited JSON decoder.
///
/// Byte chunks may split or merge lines arbitrarily; the decoder carries the
/// trailing incomplete fragment across [`feed`](Self::feed) calls, and
/// [`finish`](Self::finish) flushes a final line left unterminated when the
/// stream closed.
#[derive(Debug, Default)]
pub struct EventStreamParser {
    buffer: String,
}

impl EventStreamParser {
    /// Create an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of stream data, returning the events it completed.
    pub fn feed(&mut self, chunk: &str) -> Vec<StreamEvent> {
        self.buffer.push_str(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end_matches('\n');
            if line.trim().is_empty() {
                continue;
            }
            events.push(parse_line(line));
        }
        events
    }

    /// Flush the buffered fragment after the stream has closed.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        let rest = std::mem::take(&mut self.buffer);
        if rest.trim().is_empty() {
            None
        } else {
            Some(parse_line(&rest))
        }
    }
}

/// A line that fails to parse is not an error; it is forwarded verbatim.
fn parse_line(line: &str) -> StreamEvent {
    match serde_json::from_str(line) {
        Ok(value) => StreamEvent::Json(value),
        Err(_) => StreamEvent::Raw(line.to_string()),
    }
}
