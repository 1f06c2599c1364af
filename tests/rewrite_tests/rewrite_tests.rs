//! Tests for the Rewrite Engine
//!
//! These tests verify:
//! - Set batches patch existing lines in place and append new keys
//! - Remove batches drop every matching line
//! - A failed pass never replaces the original file
//! - The temp file never outlives a pass

use std::fs;
use std::path::{Path, PathBuf};

use linekv::codec::{JsonLinesCodec, Record, RecordCodec};
use linekv::config::temp_path_for;
use linekv::rewrite::{Action, LinePatch, LineSink, RemoveBatch, RewriteEngine, SetBatch};
use linekv::{LineKvError, Result};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn write_store(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("rw.jsonl");
    fs::write(&path, contents).unwrap();
    (temp_dir, path)
}

fn line(key: &str, data: Value) -> String {
    RecordCodec::<String, Value>::encode(&JsonLinesCodec, &key.to_string(), &data).unwrap()
}

fn file_of(lines: &[String]) -> String {
    lines.iter().map(|l| format!("{}\n", l)).collect()
}

fn read_pairs(path: &Path) -> Vec<(String, Value)> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .enumerate()
        .map(|(i, l)| {
            let record: Record<String, Value> = JsonLinesCodec.decode(l, i as u64 + 1).unwrap();
            record.into_pair()
        })
        .collect()
}

fn engine(codec: &JsonLinesCodec) -> RewriteEngine<'_, String, Value, JsonLinesCodec> {
    RewriteEngine::new(codec, false)
}

/// Codec that refuses to encode one specific value
struct RefusingCodec {
    refuse: Value,
}

impl RecordCodec<String, Value> for RefusingCodec {
    fn encode(&self, key: &String, value: &Value) -> Result<String> {
        if *value == self.refuse {
            return Err(LineKvError::Serialization("refused".to_string()));
        }
        JsonLinesCodec.encode(key, value)
    }

    fn decode(&self, line: &str, line_no: u64) -> Result<Record<String, Value>> {
        JsonLinesCodec.decode(line, line_no)
    }
}

// =============================================================================
// Set Batch Tests
// =============================================================================

#[test]
fn test_set_patches_in_place_and_appends_new() {
    let original = file_of(&[line("a", json!(1)), line("b", json!(2)), line("c", json!(3))]);
    let (_temp, path) = write_store(&original);
    let codec = JsonLinesCodec;

    let batch: SetBatch<String, Value> = vec![
        ("z".to_string(), json!(26)),
        ("b".to_string(), json!("two")),
        ("y".to_string(), json!(25)),
    ]
    .into_iter()
    .collect();
    let stats = batch.apply(&engine(&codec), &path).unwrap();

    assert_eq!(stats.kept, 2);
    assert_eq!(stats.replaced, 1);
    assert_eq!(stats.appended, 2);
    assert_eq!(stats.lines_written(), 5);
    assert_eq!(
        read_pairs(&path),
        vec![
            ("a".to_string(), json!(1)),
            ("b".to_string(), json!("two")),
            ("c".to_string(), json!(3)),
            ("z".to_string(), json!(26)),
            ("y".to_string(), json!(25)),
        ]
    );
}

#[test]
fn test_set_last_write_wins_within_batch() {
    let (_temp, path) = write_store(&file_of(&[line("a", json!(1))]));
    let codec = JsonLinesCodec;

    let batch: SetBatch<String, Value> = vec![
        ("a".to_string(), json!("first")),
        ("n".to_string(), json!("first")),
        ("a".to_string(), json!("second")),
        ("n".to_string(), json!("second")),
    ]
    .into_iter()
    .collect();
    batch.apply(&engine(&codec), &path).unwrap();

    assert_eq!(
        read_pairs(&path),
        vec![
            ("a".to_string(), json!("second")),
            ("n".to_string(), json!("second")),
        ]
    );
}

#[test]
fn test_set_collapses_stale_duplicates() {
    let original = file_of(&[line("a", json!(1)), line("b", json!(2)), line("a", json!(3))]);
    let (_temp, path) = write_store(&original);
    let codec = JsonLinesCodec;

    let batch: SetBatch<String, Value> = std::iter::once(("a".to_string(), json!(9))).collect();
    let stats = batch.apply(&engine(&codec), &path).unwrap();

    assert_eq!(stats.dropped, 1);
    assert_eq!(
        read_pairs(&path),
        vec![("a".to_string(), json!(9)), ("b".to_string(), json!(2))]
    );
}

#[test]
fn test_set_into_empty_file() {
    let (_temp, path) = write_store("");
    let codec = JsonLinesCodec;

    let batch: SetBatch<String, Value> = std::iter::once(("only".to_string(), json!(true))).collect();
    batch.apply(&engine(&codec), &path).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), format!("{}\n", line("only", json!(true))));
}

// =============================================================================
// Remove Batch Tests
// =============================================================================

#[test]
fn test_remove_drops_matching_lines() {
    let original = file_of(&[line("a", json!(1)), line("b", json!(2)), line("c", json!(3))]);
    let (_temp, path) = write_store(&original);
    let codec = JsonLinesCodec;

    let batch: RemoveBatch<String> = vec!["a".to_string(), "c".to_string(), "missing".to_string()]
        .into_iter()
        .collect();
    let stats = batch.apply(&engine(&codec), &path).unwrap();

    assert_eq!(stats.dropped, 2);
    assert_eq!(stats.kept, 1);
    assert_eq!(read_pairs(&path), vec![("b".to_string(), json!(2))]);
}

#[test]
fn test_remove_everything_leaves_empty_file() {
    let (_temp, path) = write_store(&file_of(&[line("a", json!(1))]));
    let codec = JsonLinesCodec;

    let batch: RemoveBatch<String> = std::iter::once("a".to_string()).collect();
    batch.apply(&engine(&codec), &path).unwrap();

    assert!(path.exists());
    assert_eq!(fs::read_to_string(&path).unwrap(), "");
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_malformed_line_aborts_without_swap() {
    let original = format!("{}\nnot a record\n{}\n", line("a", json!(1)), line("b", json!(2)));
    let (_temp, path) = write_store(&original);
    let codec = JsonLinesCodec;

    let batch: SetBatch<String, Value> = std::iter::once(("a".to_string(), json!(5))).collect();
    let err = batch.apply(&engine(&codec), &path).unwrap_err();

    assert!(matches!(err, LineKvError::RewriteFailed { .. }));
    assert!(matches!(err.root_cause(), LineKvError::MalformedRecord { line: 2, .. }));
    assert_eq!(fs::read_to_string(&path).unwrap(), original);
    assert!(!temp_path_for(&path).exists());
}

#[test]
fn test_encode_failure_mid_pass_aborts_without_swap() {
    let original = file_of(&[line("a", json!(1)), line("b", json!(2))]);
    let (_temp, path) = write_store(&original);
    let codec = RefusingCodec {
        refuse: json!("poison"),
    };

    // "a" is patched fine, then the appended "p" fails to encode
    let batch: SetBatch<String, Value> = vec![
        ("a".to_string(), json!(10)),
        ("p".to_string(), json!("poison")),
    ]
    .into_iter()
    .collect();
    let err = batch
        .apply(&RewriteEngine::new(&codec, true), &path)
        .unwrap_err();

    assert!(matches!(err.root_cause(), LineKvError::Serialization(_)));
    assert_eq!(fs::read_to_string(&path).unwrap(), original);
    assert!(!temp_path_for(&path).exists());
}

#[test]
fn test_missing_original_is_rewrite_failure() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("gone.jsonl");
    let codec = JsonLinesCodec;

    let batch: RemoveBatch<String> = std::iter::once("a".to_string()).collect();
    let err = batch.apply(&engine(&codec), &path).unwrap_err();

    assert!(matches!(err.root_cause(), LineKvError::Io(_)));
    assert!(!path.exists());
    assert!(!temp_path_for(&path).exists());
}

#[test]
fn test_stale_temp_file_is_overwritten() {
    let (_temp, path) = write_store(&file_of(&[line("a", json!(1))]));
    fs::write(temp_path_for(&path), "leftover garbage\n").unwrap();
    let codec = JsonLinesCodec;

    let batch: SetBatch<String, Value> = std::iter::once(("b".to_string(), json!(2))).collect();
    batch.apply(&engine(&codec), &path).unwrap();

    assert_eq!(
        read_pairs(&path),
        vec![("a".to_string(), json!(1)), ("b".to_string(), json!(2))]
    );
}

// =============================================================================
// Custom Patch Tests
// =============================================================================

/// Uppercases every string value and appends a marker record
struct Shout;

impl LinePatch<String> for Shout {
    fn patch(&mut self, key: &String, existing: &str) -> Result<Action> {
        let record: Record<String, Value> = JsonLinesCodec.decode(existing, 0)?;
        match record.value {
            Value::String(s) => Ok(Action::Replace(line(key, json!(s.to_uppercase())))),
            _ => Ok(Action::Keep),
        }
    }

    fn finalize(&mut self, sink: &mut LineSink<'_>) -> Result<()> {
        sink.push(&line("_shouted", json!(true)))
    }
}

#[test]
fn test_custom_patch_with_finalize() {
    let (_temp, path) = write_store(&file_of(&[line("a", json!("hi")), line("b", json!(2))]));
    let codec = JsonLinesCodec;

    let stats = engine(&codec).run(&path, &mut Shout).unwrap();

    assert_eq!(stats.replaced, 1);
    assert_eq!(stats.kept, 1);
    assert_eq!(stats.appended, 1);
    assert_eq!(
        read_pairs(&path),
        vec![
            ("a".to_string(), json!("HI")),
            ("b".to_string(), json!(2)),
            ("_shouted".to_string(), json!(true)),
        ]
    );
}
