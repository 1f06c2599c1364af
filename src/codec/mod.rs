//! Record Codec Module
//!
//! Encodes one (key, value) pair as one line and back.
//!
//! ## Responsibilities
//! - Produce a single line per record (never an embedded newline)
//! - Fail with `MalformedRecord` on lines that do not decode
//! - Stay pluggable: the rewrite engine and readers only see this trait,
//!   so compressed or encrypted encodings can be layered in later
//!
//! ## Line Format (JsonLinesCodec)
//! ```text
//! {"key":<K>,"data":<V>}\n
//! {"key":<K>,"data":<V>}\n
//! ...
//! ```

mod json;

pub use json::JsonLinesCodec;

use crate::error::Result;

/// One key/value pair stored as one line
#[derive(Debug, Clone, PartialEq)]
pub struct Record<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> Record<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    pub fn into_pair(self) -> (K, V) {
        (self.key, self.value)
    }
}

/// Line-level encoding of records
///
/// `line_no` is the 1-based position of the line in the file and is only
/// used to make `MalformedRecord` errors point at the offending line.
pub trait RecordCodec<K, V>: Send + Sync {
    /// Encode a record as one line, without the trailing newline
    fn encode(&self, key: &K, value: &V) -> Result<String>;

    /// Decode a full record
    fn decode(&self, line: &str, line_no: u64) -> Result<Record<K, V>>;

    /// Decode only the key. Implementations should skip materializing the value.
    fn decode_key(&self, line: &str, line_no: u64) -> Result<K> {
        self.decode(line, line_no).map(|record| record.key)
    }
}
