use tracing::debug;

use crate::models::ProtocolEvent;

/// Prefix marking a line as an event frame. Anything else on the stream
/// (keepalives, comments, blank separators) is discarded.
pub const EVENT_PREFIX: &str = "data: ";

/// Incremental decoder from raw response-body chunks to [`ProtocolEvent`]s.
///
/// Chunks arrive with no alignment to frame boundaries: a single chunk may
/// hold several events, a fraction of one, or even a fraction of the
/// `data: ` prefix. The decoder buffers bytes and only ever interprets
/// complete lines, so any re-chunking of the same stream decodes to the
/// same event sequence.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and drains every complete line it unlocked, in order.
    /// A trailing partial line stays buffered for the next chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ProtocolEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(line) = self.take_line() {
            if let Some(event) = parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// End of input. An unterminated trailing line carries no complete event
    /// and is not salvageable; returns how many bytes were discarded.
    pub fn finish(&mut self) -> usize {
        let leftover = self.buffer.len();
        if leftover > 0 {
            debug!(bytes = leftover, "discarding unterminated trailing line");
            self.buffer.clear();
        }
        leftover
    }

    // Splits on the raw newline byte, not on decoded text, so a multi-byte
    // character straddling two chunks is reassembled before interpretation.
    fn take_line(&mut self) -> Option<String> {
        let newline = self.buffer.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.buffer.drain(..=newline).collect();
        Some(
            String::from_utf8_lossy(&line)
                .trim_end_matches(['\n', '\r'])
                .to_string(),
        )
    }
}

/// A line is an event only if it carries the frame prefix and its payload
/// parses as a known tagged record. A malformed payload is dropped; one bad
/// frame must never abort the stream.
fn parse_line(line: &str) -> Option<ProtocolEvent> {
    let payload = line.strip_prefix(EVENT_PREFIX)?;
    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!("dropping malformed event line: {e}");
            None
        }
    }
}
