//! Line splitting
//!
//! Shared by the record iterators and the rewrite engine.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};

use crate::error::{LineKvError, Result};

/// Reads a store file line by line, reusing one buffer
pub struct LineStream<R = File> {
    reader: BufReader<R>,
    buf: String,
    /// 1-based number of the line currently held in `buf`
    line_no: u64,
}

impl<R: Read> LineStream<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            buf: String::new(),
            line_no: 0,
        }
    }

    /// Advance to the next line
    ///
    /// Returns `(line_no, line)` without the line terminator, or `None` at EOF.
    /// Invalid UTF-8 is reported as a malformed record.
    pub fn next_line(&mut self) -> Result<Option<(u64, &str)>> {
        self.buf.clear();
        let read = match self.reader.read_line(&mut self.buf) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(LineKvError::MalformedRecord {
                    line: self.line_no + 1,
                    reason: "line is not valid UTF-8".to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if read == 0 {
            return Ok(None);
        }

        self.line_no += 1;
        let line = self.buf.trim_end_matches(['\n', '\r']);
        Ok(Some((self.line_no, line)))
    }
}

/// Count lines without decoding them
///
/// A final line without a trailing newline still counts.
pub fn count_lines<R: Read>(inner: R) -> Result<usize> {
    let mut reader = BufReader::new(inner);
    let mut count = 0usize;

    loop {
        let chunk = reader.fill_buf()?;
        if chunk.is_empty() {
            break;
        }
        let len = chunk.len();
        let newlines = chunk.iter().filter(|&&b| b == b'\n').count();
        let ends_with_newline = chunk[len - 1] == b'\n';
        reader.consume(len);

        count += newlines;
        // Peek whether this was the last chunk and it lacked a terminator
        if !ends_with_newline && reader.fill_buf()?.is_empty() {
            count += 1;
        }
    }

    Ok(count)
}
