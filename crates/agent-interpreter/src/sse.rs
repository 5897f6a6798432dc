//! Incremental server-sent-events parser
//!
//! Bytes arrive in arbitrary chunks from `reqwest`'s `bytes_stream`, so the
//! parser buffers partial lines between calls to [`SseParser::feed`]. Lines are
//! split on `\n` before UTF-8 decoding, which keeps multi-byte characters that
//! straddle a chunk boundary intact. A trailing `\r` is stripped from each line
//! and a byte-order mark is dropped from the start of the stream.

use crate::error::{Result, SandboxError};

/// Event type used when a block carries no `event:` field
pub const DEFAULT_EVENT: &str = "message";

/// Longest unterminated line the parser will buffer
pub const MAX_LINE_LEN: usize = 1 << 20;

/// One dispatched event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type (`stdout`, `stderr`, ...)
    pub event: String,
    /// Data lines joined with `\n`
    pub data: String,
    /// Last event id seen on the stream, if any
    pub id: Option<String>,
}

/// Stateful parser turning byte chunks into [`SseEvent`]s
#[derive(Debug)]
pub struct SseParser {
    buffer: Vec<u8>,
    // Bytes of `buffer` already known to hold no newline.
    scanned: usize,
    max_line_len: usize,
    started: bool,
    event: Option<String>,
    data: Vec<String>,
    last_id: Option<String>,
}

impl Default for SseParser {
    fn default() -> Self {
        Self::with_max_line_len(MAX_LINE_LEN)
    }
}

impl SseParser {
    /// Create an empty parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser that rejects lines longer than `max_line_len` bytes
    pub fn with_max_line_len(max_line_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_line_len,
            started: false,
            event: None,
            data: Vec::new(),
            last_id: None,
        }
    }

    /// Feed a chunk, returning every event completed by it
    ///
    /// Fails once an unterminated line grows past the length limit; the
    /// parser should not be fed again after that.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>> {
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut line_start = 0;
        let mut search_from = self.scanned;
        while let Some(offset) = buffer[search_from..].iter().position(|&b| b == b'\n') {
            let line_end = search_from + offset;
            let line = String::from_utf8_lossy(&buffer[line_start..line_end]);
            if let Some(event) = self.process_raw_line(&line) {
                events.push(event);
            }
            line_start = line_end + 1;
            search_from = line_start;
        }

        buffer.drain(..line_start);
        if buffer.len() > self.max_line_len {
            return Err(SandboxError::Stream(format!(
                "event stream line exceeds {} bytes",
                self.max_line_len
            )));
        }
        self.scanned = buffer.len();
        self.buffer = buffer;
        Ok(events)
    }

    fn process_raw_line(&mut self, line: &str) -> Option<SseEvent> {
        let mut line = line.strip_suffix('\r').unwrap_or(line);
        if !self.started {
            self.started = true;
            line = line.strip_prefix('\u{feff}').unwrap_or(line);
        }
        self.process_line(line)
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    // Blocks with an explicit type but no data still dispatch, so bare
    // end-of-execution markers such as `event: end` are not lost.
    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() && event.is_none() {
            return None;
        }

        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: event
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT.to_string()),
            data,
            id: self.last_id.clone(),
        })
    }
}
