//! Streaming Reader Module
//!
//! Lazy, forward-only access to the records of a store file.
//!
//! ## Responsibilities
//! - Read the file one line at a time (one reusable line buffer)
//! - Decode each line independently through a `RecordCodec`
//! - Fail fast: the first malformed line ends the scan with an error
//!
//! Every read-style store operation (`get_item`, `key`, `keys`, `length`,
//! `iterate`) is a short scan over one of these iterators.

mod lines;
mod records;

pub use lines::{count_lines, LineStream};
pub use records::{Keys, Records};
