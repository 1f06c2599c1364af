//! JSON lines codec
//!
//! The on-disk contract: one compact JSON object per line with a `key` and a
//! `data` field. Both are required; unknown fields are ignored.

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

use crate::error::{LineKvError, Result};

use super::{Record, RecordCodec};

/// Borrowed view used for encoding
#[derive(Serialize)]
struct LineRef<'a, K, V> {
    key: &'a K,
    data: &'a V,
}

#[derive(Deserialize)]
struct LineOwned<K, V> {
    key: K,
    data: V,
}

/// Key-only view; `data` must still be present but is skipped
#[derive(Deserialize)]
struct LineKey<K> {
    key: K,
    #[allow(dead_code)]
    data: IgnoredAny,
}

/// Codec for `{"key": K, "data": V}` lines
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesCodec;

fn malformed(line_no: u64, err: serde_json::Error) -> LineKvError {
    LineKvError::MalformedRecord {
        line: line_no,
        reason: err.to_string(),
    }
}

impl<K, V> RecordCodec<K, V> for JsonLinesCodec
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    fn encode(&self, key: &K, value: &V) -> Result<String> {
        // Compact output escapes control characters, so no raw '\n' can appear
        serde_json::to_string(&LineRef { key, data: value })
            .map_err(|e| LineKvError::Serialization(e.to_string()))
    }

    fn decode(&self, line: &str, line_no: u64) -> Result<Record<K, V>> {
        let parsed: LineOwned<K, V> =
            serde_json::from_str(line).map_err(|e| malformed(line_no, e))?;
        Ok(Record::new(parsed.key, parsed.data))
    }

    fn decode_key(&self, line: &str, line_no: u64) -> Result<K> {
        let parsed: LineKey<K> = serde_json::from_str(line).map_err(|e| malformed(line_no, e))?;
        Ok(parsed.key)
    }
}
