//! Drained mutation batches
//!
//! A batch is everything one coordinator drain took off a queue. Each batch
//! knows how to turn itself into a `LinePatch` for one rewrite pass.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::path::Path;

use crate::codec::RecordCodec;
use crate::error::Result;

use super::{Action, LinePatch, LineSink, RewriteEngine, RewriteStats};

/// Pending sets, last write wins per key
///
/// Keys keep the position of their first insertion so genuinely new keys
/// are appended in the order they were first queued.
#[derive(Debug, Clone)]
pub struct SetBatch<K, V> {
    entries: Vec<(K, V)>,
    index: HashMap<K, usize>,
}

impl<K, V> Default for SetBatch<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K, V> SetBatch<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a value for `key`, replacing any earlier value in this batch
    pub fn insert(&mut self, key: K, value: V) {
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run one rewrite pass that patches existing lines in place and appends
    /// the rest. Stale duplicate lines for a batched key are dropped.
    pub fn apply<C>(&self, engine: &RewriteEngine<'_, K, V, C>, path: &Path) -> Result<RewriteStats>
    where
        C: RecordCodec<K, V>,
    {
        let mut pass = SetPass {
            batch: self,
            codec: engine.codec(),
            written: vec![false; self.entries.len()],
        };
        engine.run(path, &mut pass)
    }
}

impl<K, V> FromIterator<(K, V)> for SetBatch<K, V>
where
    K: Eq + Hash + Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut batch = SetBatch::new();
        for (key, value) in iter {
            batch.insert(key, value);
        }
        batch
    }
}

struct SetPass<'b, 'c, K, V, C> {
    batch: &'b SetBatch<K, V>,
    codec: &'c C,
    /// Slot already emitted, either patched in place or appended
    written: Vec<bool>,
}

impl<'b, 'c, K, V, C> LinePatch<K> for SetPass<'b, 'c, K, V, C>
where
    K: Eq + Hash,
    C: RecordCodec<K, V>,
{
    fn patch(&mut self, key: &K, _line: &str) -> Result<Action> {
        let Some(&slot) = self.batch.index.get(key) else {
            return Ok(Action::Keep);
        };
        if self.written[slot] {
            return Ok(Action::Drop);
        }
        self.written[slot] = true;
        let (key, value) = &self.batch.entries[slot];
        Ok(Action::Replace(self.codec.encode(key, value)?))
    }

    fn finalize(&mut self, sink: &mut LineSink<'_>) -> Result<()> {
        for (slot, (key, value)) in self.batch.entries.iter().enumerate() {
            if !self.written[slot] {
                sink.push(&self.codec.encode(key, value)?)?;
                self.written[slot] = true;
            }
        }
        Ok(())
    }
}

/// Pending removals
#[derive(Debug, Clone)]
pub struct RemoveBatch<K> {
    keys: HashSet<K>,
}

impl<K> RemoveBatch<K>
where
    K: Eq + Hash,
{
    pub fn contains(&self, key: &K) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Run one rewrite pass that drops every line whose key is in the batch
    pub fn apply<V, C>(&self, engine: &RewriteEngine<'_, K, V, C>, path: &Path) -> Result<RewriteStats>
    where
        C: RecordCodec<K, V>,
    {
        engine.run(path, &mut RemovePass { batch: self })
    }
}

impl<K> FromIterator<K> for RemoveBatch<K>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

struct RemovePass<'b, K> {
    batch: &'b RemoveBatch<K>,
}

impl<'b, K> LinePatch<K> for RemovePass<'b, K>
where
    K: Eq + Hash,
{
    fn patch(&mut self, key: &K, _line: &str) -> Result<Action> {
        if self.batch.contains(key) {
            Ok(Action::Drop)
        } else {
            Ok(Action::Keep)
        }
    }
}
