use encoding_rs::{CoderResult, Decoder, UTF_8};
use stegomark_core::ProgressEvent;
use stegomark_logging::{stego_debug, stego_warn};

/// Prefix of every record line in the event stream.
pub const EVENT_PREFIX: &str = "data: ";

/// Incremental decoder for the newline-delimited `data: {json}` event stream.
///
/// Chunks may split a record (or a UTF-8 sequence) anywhere; text after the
/// last newline is carried over to the next chunk and never parsed early.
pub struct StreamDecoder {
    decoder: Decoder,
    buffer: String,
    malformed: usize,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self {
            decoder: UTF_8.new_decoder_with_bom_removal(),
            buffer: String::new(),
            malformed: 0,
        }
    }

    /// Feed one transport chunk; returns the records completed by it, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ProgressEvent> {
        self.decode_into_buffer(chunk, false);
        self.drain_complete_lines()
    }

    /// Flush at end of stream.
    ///
    /// A trailing record without its newline is still delivered when it parses;
    /// anything else left over is a truncated record and is dropped.
    pub fn finish(&mut self) -> Vec<ProgressEvent> {
        self.decode_into_buffer(&[], true);
        let mut events = self.drain_complete_lines();

        let remainder = std::mem::take(&mut self.buffer);
        let remainder = remainder.trim_end_matches('\r');
        match remainder.strip_prefix(EVENT_PREFIX) {
            Some(payload) => match serde_json::from_str::<ProgressEvent>(payload) {
                Ok(event) => events.push(event),
                Err(err) => {
                    stego_debug!(
                        "discarding truncated record at end of stream ({} bytes): {}",
                        payload.len(),
                        err
                    );
                }
            },
            None if !remainder.trim().is_empty() => {
                stego_debug!(
                    "discarding {} bytes of unterminated text at end of stream",
                    remainder.len()
                );
            }
            None => {}
        }

        self.decoder = UTF_8.new_decoder_with_bom_removal();
        events
    }

    /// Number of record lines skipped because their JSON did not parse.
    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    fn decode_into_buffer(&mut self, mut bytes: &[u8], last: bool) {
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(bytes.len())
                .unwrap_or(bytes.len() * 3 + 4);
            self.buffer.reserve(needed);
            let (result, read, _had_errors) =
                self.decoder.decode_to_string(bytes, &mut self.buffer, last);
            bytes = &bytes[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }
    }

    fn drain_complete_lines(&mut self) -> Vec<ProgressEvent> {
        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };
        let remainder = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, remainder);

        complete
            .split('\n')
            .filter_map(|line| self.parse_line(line))
            .collect()
    }

    fn parse_line(&mut self, line: &str) -> Option<ProgressEvent> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let payload = line.strip_prefix(EVENT_PREFIX)?;
        match serde_json::from_str::<ProgressEvent>(payload) {
            Ok(event) => Some(event),
            Err(err) => {
                self.malformed += 1;
                stego_warn!("skipping malformed event record: {}; line={:?}", err, payload);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StreamDecoder;

    #[test]
    fn blank_separator_lines_are_ignored() {
        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(b"data: {\"stage\":\"init\",\"progress\":0,\"message\":\"a\"}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(decoder.malformed_count(), 0);
    }

    #[test]
    fn carriage_returns_are_tolerated() {
        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(b"data: {\"stage\":\"init\",\"progress\":0,\"message\":\"a\"}\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "a");
    }

    #[test]
    fn partial_line_is_held_until_newline() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.feed(b"data: {\"stage\":\"init\",").is_empty());
        assert!(decoder.feed(b"\"progress\":5,\"message\":\"x\"}").is_empty());
        let events = decoder.feed(b"\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].progress, 5.0);
    }

    #[test]
    fn unterminated_but_complete_record_is_flushed_once() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder
            .feed(b"data: {\"stage\":\"complete\",\"progress\":100,\"message\":\"ok\",\"result\":1}")
            .is_empty());
        let events = decoder.finish();
        assert_eq!(events.len(), 1);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn truncated_record_is_discarded_not_counted() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.feed(b"data: {\"stage\":\"embed").is_empty());
        assert!(decoder.finish().is_empty());
        assert_eq!(decoder.malformed_count(), 0);
    }
}
