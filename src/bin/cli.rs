//! LineKV CLI
//!
//! Command-line interface for inspecting and editing a LineKV store file.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use linekv::{JsonStore, StoreConfig};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

/// LineKV CLI
#[derive(Parser, Debug)]
#[command(name = "linekv-cli")]
#[command(about = "CLI for LineKV line-delimited key-value stores")]
#[command(version)]
struct Args {
    /// Folder holding the store file
    #[arg(short, long)]
    folder: Option<String>,

    /// Store name (the file is NAME.jsonl)
    #[arg(short, long, default_value = "store")]
    name: String,

    /// Skip fsync before swapping in a rewritten file
    #[arg(long)]
    no_sync: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value; parsed as JSON, otherwise stored as a string
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Print the key at a 1-based position
    Key {
        /// Position, starting at 1
        index: usize,
    },

    /// List all keys in file order
    Keys,

    /// Print the number of records
    Len,

    /// Print every record as `key<TAB>value`
    Dump,

    /// Remove every record
    Clear,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,linekv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> linekv::Result<()> {
    let mut builder = StoreConfig::builder()
        .name(&args.name)
        .sync_on_rewrite(!args.no_sync);
    if let Some(folder) = &args.folder {
        builder = builder.folder(folder);
    }
    let store = JsonStore::open(builder.build()?)?;

    match args.command {
        Commands::Get { key } => match store.get_item(&key)? {
            Some(value) => println!("{}", value),
            None => println!("(nil)"),
        },
        Commands::Set { key, value } => {
            store.set_item(key, parse_value(&value))?;
            println!("OK");
        }
        Commands::Del { key } => {
            store.remove_item(&key)?;
            println!("OK");
        }
        Commands::Key { index } => match store.key(index)? {
            Some(key) => println!("{}", key),
            None => println!("(nil)"),
        },
        Commands::Keys => {
            for key in store.keys()? {
                println!("{}", key);
            }
        }
        Commands::Len => println!("{}", store.length()?),
        Commands::Dump => store.iterate(|value, key| println!("{}\t{}", key, value))?,
        Commands::Clear => {
            store.clear()?;
            println!("OK");
        }
    }

    Ok(())
}

/// JSON if it parses, otherwise the raw text as a JSON string
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
