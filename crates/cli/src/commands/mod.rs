//! CLI commands module.

use anyhow::{Context, Result};
use clap::Subcommand;
use herdledger_chain::{Ledger, LedgerConfig};
use herdledger_storage::{ChainStore, Storage};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

mod block;
mod init;
mod query;
mod record;
mod seal;

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new ledger
    Init(init::InitArgs),
    /// Submit animal record lifecycle events
    Record(record::RecordArgs),
    /// Seal pending transactions into a new block
    Seal(seal::SealArgs),
    /// Show the net balance of an address
    Balance {
        /// Address to inspect
        address: String,
    },
    /// Show the sealed history of an animal
    History {
        /// Animal id
        animal_id: String,
    },
    /// Check that an animal has an approved record on chain
    Verify {
        /// Animal id
        animal_id: String,
    },
    /// Issue a provenance certificate for an approved animal
    Certificate {
        /// Animal id
        animal_id: String,
    },
    /// Show the current review status of an animal
    Status {
        /// Animal id
        animal_id: String,
    },
    /// Show ledger statistics
    Stats,
    /// Block operations
    Blocks(block::BlockArgs),
}

pub async fn run(cmd: Commands, data_dir: &Path) -> Result<()> {
    match cmd {
        Commands::Init(args) => init::run(args, data_dir),
        Commands::Record(args) => record::run(args, data_dir),
        Commands::Seal(args) => seal::run(args, data_dir).await,
        Commands::Balance { address } => query::balance(data_dir, &address),
        Commands::History { animal_id } => query::history(data_dir, &animal_id),
        Commands::Verify { animal_id } => query::verify(data_dir, &animal_id),
        Commands::Certificate { animal_id } => query::certificate(data_dir, &animal_id),
        Commands::Status { animal_id } => query::status(data_dir, &animal_id),
        Commands::Stats => query::stats(data_dir),
        Commands::Blocks(args) => block::run(args, data_dir),
    }
}

/// An opened ledger plus the store it writes through.
pub(crate) struct Session {
    pub ledger: Ledger,
    store: ChainStore,
}

impl Session {
    /// Flush pending writes to disk.
    pub fn close(self) -> Result<()> {
        self.store
            .storage()
            .flush()
            .context("Failed to flush ledger database")
    }
}

pub(crate) fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.json")
}

pub(crate) fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("chain")
}

pub(crate) fn load_config(data_dir: &Path) -> Result<LedgerConfig> {
    let contents = fs::read_to_string(config_path(data_dir))
        .context("Failed to read config.json. Did you run 'herdledger init'?")?;
    serde_json::from_str(&contents).context("Invalid config.json")
}

/// Open the ledger stored under `data_dir`.
pub(crate) fn open_session(data_dir: &Path) -> Result<Session> {
    let config = load_config(data_dir)?;
    let storage = Storage::open(db_path(data_dir))
        .context("Failed to open storage. Did you run 'herdledger init'?")?;
    let store = ChainStore::new(storage);
    let ledger = Ledger::open(store.clone(), config).context("Failed to load ledger")?;
    Ok(Session { ledger, store })
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
