use std::str::FromStr;

use rbac_inspector_core::{AppError, AppResult};
use rbac_inspector_domain::{BindingPayload, RawWatchEvent, WatchEventType};
use serde::Deserialize;
use serde_json::Value;

/// Splits a chunked watch body into complete newline-delimited frames.
#[derive(Debug, Default)]
pub struct WatchLineDecoder {
    buffer: Vec<u8>,
    // Buffered bytes already known to hold no newline.
    scanned: usize,
}

impl WatchLineDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one body chunk and returns every line it completed.
    ///
    /// Only the newly appended bytes are searched for line ends.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut line_start = 0;
        let mut cursor = self.scanned;
        while let Some(offset) = self.buffer[cursor..].iter().position(|byte| *byte == b'\n') {
            let line_end = cursor + offset;
            if let Some(line) = non_blank(&self.buffer[line_start..line_end]) {
                lines.push(line);
            }
            line_start = line_end + 1;
            cursor = line_start;
        }

        self.buffer.drain(..line_start);
        self.scanned = self.buffer.len();

        lines
    }

    /// Returns the trailing unterminated line, if any, and clears the buffer.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        non_blank(&rest)
    }
}

fn non_blank(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

#[derive(Debug, Deserialize)]
struct WireWatchFrame {
    #[serde(rename = "type")]
    event_type: String,
    object: Value,
}

/// Decodes one watch frame into a raw event.
///
/// Only the frame envelope can fail here; object shape mismatches are kept in
/// the payload for the version adapter to report.
pub fn decode_watch_frame(line: &str) -> AppResult<RawWatchEvent> {
    let frame: WireWatchFrame = serde_json::from_str(line)
        .map_err(|error| AppError::Conversion(format!("invalid watch frame: {error}")))?;
    let event_type = WatchEventType::from_str(frame.event_type.as_str())?;

    Ok(RawWatchEvent::new(
        event_type,
        BindingPayload::decode(frame.object),
    ))
}
