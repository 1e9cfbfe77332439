//! JSON-lines replay feed.
//!
//! Reads captured events, one feed frame per line, from any buffered async
//! reader (stdin, a file). Blank lines and lines starting with `#` are
//! skipped. Malformed lines are logged and skipped so one bad capture line
//! does not end a replay.

use std::collections::VecDeque;

use pulsewatch_core::RawEvent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::error::FeedError;
use crate::frame::parse_frame;

pub struct JsonLinesReader<R> {
    lines: Lines<R>,
    line_no: usize,
    pending: VecDeque<RawEvent>,
    skipped: usize,
}

impl<R: AsyncBufRead + Unpin> JsonLinesReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            pending: VecDeque::new(),
            skipped: 0,
        }
    }

    /// Next event in file order, or `None` at end of input.
    ///
    /// Only I/O failures are returned as errors.
    pub async fn next_event(&mut self) -> Result<Option<RawEvent>, FeedError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }

            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            match parse_frame(trimmed) {
                Ok(events) => self.pending.extend(events),
                Err(e) => {
                    let err = FeedError::Line {
                        line: self.line_no,
                        source: Box::new(e),
                    };
                    tracing::warn!(error = %err, "skipping malformed replay line");
                    self.skipped += 1;
                }
            }
        }
    }

    /// Number of lines skipped as malformed so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_events_in_order_and_skips_noise() {
        let input = concat!(
            "# captured 2026-03-01\n",
            "{\"channel\":\"a\",\"payload\":{\"x\":1}}\n",
            "\n",
            "garbage\n",
            "[{\"channel\":\"b\",\"payload\":\"2\"},{\"channel\":\"c\",\"payload\":3}]\n",
        );
        let mut reader = JsonLinesReader::new(input.as_bytes());

        let mut channels = Vec::new();
        while let Some(event) = reader.next_event().await.unwrap() {
            channels.push(event.channel);
        }

        assert_eq!(channels, ["a", "b", "c"]);
        assert_eq!(reader.skipped(), 1);
    }

    #[tokio::test]
    async fn empty_input_ends_immediately() {
        let mut reader = JsonLinesReader::new(&b""[..]);
        assert!(reader.next_event().await.unwrap().is_none());
    }
}
