//! Rewrite Engine Module
//!
//! Applies a batch of mutations by streaming the store file into a fresh
//! temporary file and swapping it over the original.
//!
//! ## Responsibilities
//! - Patch, drop or keep every existing line in one forward pass
//! - Append records for keys that never appeared in the file
//! - Promote the temporary file only after it is fully written (and synced)
//! - Never promote on failure; the original stays as it was
//!
//! ## Pass Layout
//! ```text
//!   users.jsonl ──read──► patch(key, line) ──write──► users-temp.jsonl
//!                          Keep / Replace / Drop            │
//!                                                finalize (append new keys)
//!                                                           │
//!                           users.jsonl ◄──── rename ───────┘
//! ```

mod batch;
mod engine;

pub use batch::{RemoveBatch, SetBatch};
pub use engine::{Action, LinePatch, LineSink, RewriteEngine, RewriteStats};
