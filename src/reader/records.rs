//! Record iterators
//!
//! Lazy decoders over a `LineStream`. Both iterators are fused after the
//! first error so a caller that keeps polling never sees records past a
//! malformed line.

use std::fs::File;
use std::io::Read;
use std::marker::PhantomData;
use std::path::Path;

use crate::codec::{Record, RecordCodec};
use crate::error::Result;

use super::LineStream;

/// Iterator over fully decoded records in file order
pub struct Records<'c, K, V, C, R = File> {
    lines: LineStream<R>,
    codec: &'c C,
    done: bool,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<'c, K, V, C> Records<'c, K, V, C, File>
where
    C: RecordCodec<K, V>,
{
    /// Open a fresh scan over the file at `path`
    pub fn open(path: &Path, codec: &'c C) -> Result<Self> {
        Ok(Self::new(File::open(path)?, codec))
    }
}

impl<'c, K, V, C, R> Records<'c, K, V, C, R>
where
    C: RecordCodec<K, V>,
    R: Read,
{
    pub fn new(inner: R, codec: &'c C) -> Self {
        Self {
            lines: LineStream::new(inner),
            codec,
            done: false,
            _marker: PhantomData,
        }
    }

    fn advance(&mut self) -> Result<Option<Record<K, V>>> {
        match self.lines.next_line()? {
            Some((line_no, line)) => self.codec.decode(line, line_no).map(Some),
            None => Ok(None),
        }
    }
}

impl<'c, K, V, C, R> Iterator for Records<'c, K, V, C, R>
where
    C: RecordCodec<K, V>,
    R: Read,
{
    type Item = Result<Record<K, V>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Iterator over keys only, in file order
///
/// Values are never materialized; `find_value` decodes the full record only
/// for the first line whose key matches.
pub struct Keys<'c, K, V, C, R = File> {
    lines: LineStream<R>,
    codec: &'c C,
    done: bool,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<'c, K, V, C> Keys<'c, K, V, C, File>
where
    C: RecordCodec<K, V>,
{
    pub fn open(path: &Path, codec: &'c C) -> Result<Self> {
        Ok(Self::new(File::open(path)?, codec))
    }
}

impl<'c, K, V, C, R> Keys<'c, K, V, C, R>
where
    C: RecordCodec<K, V>,
    R: Read,
{
    pub fn new(inner: R, codec: &'c C) -> Self {
        Self {
            lines: LineStream::new(inner),
            codec,
            done: false,
            _marker: PhantomData,
        }
    }

    /// Scan for the first record whose key equals `key` and decode its value
    ///
    /// Stops reading at the match.
    pub fn find_value(mut self, key: &K) -> Result<Option<V>>
    where
        K: PartialEq,
    {
        while let Some((line_no, line)) = self.lines.next_line()? {
            if self.codec.decode_key(line, line_no)? == *key {
                return self.codec.decode(line, line_no).map(|record| Some(record.value));
            }
        }
        Ok(None)
    }

    fn advance(&mut self) -> Result<Option<K>> {
        match self.lines.next_line()? {
            Some((line_no, line)) => self.codec.decode_key(line, line_no).map(Some),
            None => Ok(None),
        }
    }
}

impl<'c, K, V, C, R> Iterator for Keys<'c, K, V, C, R>
where
    C: RecordCodec<K, V>,
    R: Read,
{
    type Item = Result<K>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(key)) => Some(Ok(key)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
