//! Initialize ledger command.

use super::{config_path, db_path};
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use herdledger_chain::{Ledger, LedgerConfig, PendingPoolConfig};
use herdledger_storage::{ChainStore, Storage};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Args)]
pub struct InitArgs {
    /// Leading zero hex characters required of each block hash
    #[arg(long, default_value = "2")]
    difficulty: u32,

    /// Amount paid to the beneficiary of each sealed block
    #[arg(long, default_value = "100")]
    reward: u64,

    /// Maximum number of pending transactions
    #[arg(long, default_value = "10000")]
    max_pending: usize,
}

pub fn run(args: InitArgs, data_dir: &Path) -> Result<()> {
    println!("{}", "Initializing herdledger...".bold().cyan());
    println!();

    let config_file = config_path(data_dir);
    if config_file.exists() {
        bail!(
            "Ledger already initialized at {}",
            data_dir.display()
        );
    }

    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;
    println!("{}  Created data directory", "✓".green().bold());

    let config = LedgerConfig {
        difficulty: args.difficulty,
        mining_reward: args.reward,
        pool: PendingPoolConfig {
            max_transactions: args.max_pending,
        },
    };

    let storage = Storage::open(db_path(data_dir)).context("Failed to open storage")?;
    let store = ChainStore::new(storage);
    let ledger = Ledger::open(store.clone(), config.clone())
        .context("Failed to initialize genesis block")?;
    store.storage().flush()?;

    let genesis = &ledger.chain()[0];
    println!("{}  Created genesis block", "✓".green().bold());
    println!("    Hash:  {}", genesis.hash.to_hex().bright_yellow());
    println!("    Index: {}", "0".bright_cyan());

    fs::write(&config_file, serde_json::to_string_pretty(&config)?)?;
    info!(
        data_dir = %data_dir.display(),
        difficulty = config.difficulty,
        mining_reward = config.mining_reward,
        "ledger initialized"
    );
    println!(
        "{}  Saved config to: {}",
        "✓".green().bold(),
        config_file.display().to_string().bright_black()
    );

    println!();
    println!("{}", "Ledger initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  • Use {} to register an animal",
        "herdledger record create".bright_cyan()
    );
    println!(
        "  • Use {} to seal pending events",
        "herdledger seal".bright_cyan()
    );
    println!(
        "  • Use {} to inspect an animal",
        "herdledger history".bright_cyan()
    );

    Ok(())
}
