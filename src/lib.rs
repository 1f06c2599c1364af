//! # LineKV
//!
//! A key-value store backed by a single line-delimited JSON file:
//! - One self-contained `{"key": .., "data": ..}` object per line
//! - Streaming reads: memory use is bounded by the longest line
//! - Mutations rewrite the file into a temp file and swap it in atomically
//! - Concurrent set/remove calls are batched into as few passes as possible
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Store Handle                          │
//! │   get_item / key / keys / length / iterate                   │
//! │   set_item / remove_item / clear                             │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │ reads                        │ mutations
//!                ▼                              ▼
//!   ┌────────────────────────┐     ┌────────────────────────────┐
//!   │  Mutation Coordinator  │◄────│  set lane │ remove lane     │
//!   │  (quiescence gate)     │     │  single in-flight slot      │
//!   └───────────┬────────────┘     └─────────────┬──────────────┘
//!               ▼                                ▼
//!   ┌────────────────────────┐     ┌────────────────────────────┐
//!   │   Streaming Reader     │     │      Rewrite Engine        │
//!   │  (line-by-line decode) │     │ old → temp → atomic rename │
//!   └───────────┬────────────┘     └─────────────┬──────────────┘
//!               └──────────────┬─────────────────┘
//!                              ▼
//!                     ┌─────────────────┐
//!                     │  Record Codec   │
//!                     │  (JSON lines)   │
//!                     └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use linekv::{JsonStore, StoreConfig};
//! use serde_json::json;
//!
//! let config = StoreConfig::builder().name("users").folder("./data").build()?;
//! let store = JsonStore::open(config)?;
//!
//! store.set_item("alice".to_string(), json!({"age": 31}))?;
//! assert_eq!(store.get_item(&"alice".to_string())?, Some(json!({"age": 31})));
//! # Ok::<(), linekv::LineKvError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod reader;
pub mod rewrite;
pub mod coordinator;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LineKvError, Result};
pub use config::StoreConfig;
pub use codec::{JsonLinesCodec, Record, RecordCodec};
pub use store::{JsonStore, Store};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LineKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
