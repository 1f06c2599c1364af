//! Rewrite pass
//!
//! Stream old file → temporary file → atomic rename.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::Path;

use crate::codec::RecordCodec;
use crate::config::temp_path_for;
use crate::error::{LineKvError, Result};
use crate::reader::LineStream;

/// What to do with one existing line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Copy the line unchanged
    Keep,
    /// Write this line instead
    Replace(String),
    /// Write nothing
    Drop,
}

/// Line counts of a completed pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub kept: u64,
    pub replaced: u64,
    pub dropped: u64,
    pub appended: u64,
}

impl RewriteStats {
    /// Number of lines in the file after the swap
    pub fn lines_written(&self) -> u64 {
        self.kept + self.replaced + self.appended
    }
}

/// Per-pass decisions: one call per existing line, then one finalize call
pub trait LinePatch<K> {
    /// Decide the fate of an existing line whose key decoded to `key`
    fn patch(&mut self, key: &K, line: &str) -> Result<Action>;

    /// Append lines after the last existing line was handled
    fn finalize(&mut self, _sink: &mut LineSink<'_>) -> Result<()> {
        Ok(())
    }
}

/// Write handle given to the finalize hook
pub struct LineSink<'a> {
    writer: &'a mut BufWriter<File>,
    appended: u64,
}

impl<'a> LineSink<'a> {
    /// Append one encoded record (without its newline)
    pub fn push(&mut self, line: &str) -> Result<()> {
        write_line(self.writer, line)?;
        self.appended += 1;
        Ok(())
    }
}

fn write_line(writer: &mut BufWriter<File>, line: &str) -> Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Runs rewrite passes over store files
///
/// The engine only decodes keys; what happens to each line is decided by
/// the caller's `LinePatch`.
pub struct RewriteEngine<'c, K, V, C> {
    codec: &'c C,
    sync: bool,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<'c, K, V, C> RewriteEngine<'c, K, V, C>
where
    C: RecordCodec<K, V>,
{
    /// Create an engine; `sync` fsyncs the temporary file before the swap
    pub fn new(codec: &'c C, sync: bool) -> Self {
        Self {
            codec,
            sync,
            _marker: PhantomData,
        }
    }

    pub fn codec(&self) -> &'c C {
        self.codec
    }

    /// Run one pass over the file at `path`
    ///
    /// Steps:
    /// 1. Open the original for reading and `{stem}-temp.jsonl` for writing
    /// 2. For each line: decode its key, ask `patch`, write accordingly
    /// 3. Call `patch.finalize` to append lines for keys never seen
    /// 4. Flush (and fsync), then rename the temp file over the original
    ///
    /// Any failure returns `RewriteFailed`; the temp file is removed and the
    /// original is left untouched.
    pub fn run<P>(&self, path: &Path, patch: &mut P) -> Result<RewriteStats>
    where
        P: LinePatch<K>,
    {
        let temp_path = temp_path_for(path);

        let result = self
            .write_temp(path, &temp_path, patch)
            .and_then(|stats| {
                // rename replaces the destination atomically on one filesystem
                fs::rename(&temp_path, path)?;
                Ok(stats)
            });

        match result {
            Ok(stats) => {
                tracing::debug!(
                    path = %path.display(),
                    kept = stats.kept,
                    replaced = stats.replaced,
                    dropped = stats.dropped,
                    appended = stats.appended,
                    "rewrite pass complete"
                );
                Ok(stats)
            }
            Err(e) => {
                discard_temp(&temp_path);
                tracing::error!(path = %path.display(), error = %e, "rewrite pass failed");
                Err(LineKvError::rewrite_failed(path, e))
            }
        }
    }

    /// Steps 1-3 plus flush; the temp file is complete when this returns Ok
    fn write_temp<P>(&self, path: &Path, temp_path: &Path, patch: &mut P) -> Result<RewriteStats>
    where
        P: LinePatch<K>,
    {
        let mut lines = LineStream::new(File::open(path)?);
        let temp = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(temp_path)?;
        let mut writer = BufWriter::new(temp);
        let mut stats = RewriteStats::default();

        while let Some((line_no, line)) = lines.next_line()? {
            let key = self.codec.decode_key(line, line_no)?;
            match patch.patch(&key, line)? {
                Action::Keep => {
                    write_line(&mut writer, line)?;
                    stats.kept += 1;
                }
                Action::Replace(new_line) => {
                    write_line(&mut writer, &new_line)?;
                    stats.replaced += 1;
                }
                Action::Drop => stats.dropped += 1,
            }
        }

        let mut sink = LineSink {
            writer: &mut writer,
            appended: 0,
        };
        patch.finalize(&mut sink)?;
        stats.appended = sink.appended;

        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|e| LineKvError::Io(e.into_error()))?;
        if self.sync {
            file.sync_all()?;
        }

        Ok(stats)
    }
}

/// Best-effort removal of a partially written temp file
fn discard_temp(temp_path: &Path) {
    if let Err(e) = fs::remove_file(temp_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %temp_path.display(), error = %e, "could not remove temp file");
        }
    }
}
