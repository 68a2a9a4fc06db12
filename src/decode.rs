//! Incremental NDJSON frame decoding.
//!
//! The upstream body is newline-delimited JSON, and chunk boundaries land
//! anywhere: mid-line, mid multi-byte character. [`RecordDecoder`]
//! reassembles complete lines from raw byte chunks and parses each into an
//! [`UpstreamRecord`]. It performs no I/O, so chunking behavior can be
//! tested exhaustively with synthetic splits.

use crate::types::UpstreamRecord;

/// Reassembles `\n`-delimited JSON records from arbitrary byte chunks.
///
/// Owned by a single in-flight request; never shared.
#[derive(Debug, Default)]
pub struct RecordDecoder {
    /// Unterminated tail: everything received after the last `\n`.
    buf: Vec<u8>,
}

impl RecordDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of the upstream body, yielding every record whose line
    /// completed within it, in input order.
    ///
    /// Lines are split off at the byte level before UTF-8 conversion, so a
    /// multi-byte character straddling two chunks stays intact in the buffer
    /// until its line terminates. Blank lines and lines that fail to parse
    /// are dropped: upstream occasionally emits garbage, and the translation
    /// favors availability over completeness.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<UpstreamRecord> {
        self.buf.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(record) = parse_line(&line[..line.len() - 1]) {
                records.push(record);
            }
        }
        records
    }

    /// End of input. The unterminated remainder is discarded, matching the
    /// upstream contract that every record line is newline-terminated.
    /// Returns how many bytes were thrown away so callers can log it.
    pub fn finish(self) -> usize {
        self.buf.len()
    }
}

fn parse_line(line: &[u8]) -> Option<UpstreamRecord> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    serde_json::from_str(text).ok()
}
