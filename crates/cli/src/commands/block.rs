//! Block inspection commands.

use super::open_session;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use herdledger_core::Hash;
use std::path::Path;

#[derive(Args)]
pub struct BlockArgs {
    #[command(subcommand)]
    command: BlockCommand,
}

#[derive(Subcommand)]
enum BlockCommand {
    /// List recent blocks
    List {
        /// Number of blocks to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },
    /// Show detailed block information
    Info {
        /// Block index or hash (hex format)
        block_id: String,
    },
}

pub fn run(args: BlockArgs, data_dir: &Path) -> Result<()> {
    match args.command {
        BlockCommand::List { count } => list_blocks(data_dir, count),
        BlockCommand::Info { block_id } => show_block_info(data_dir, &block_id),
    }
}

fn list_blocks(data_dir: &Path, count: usize) -> Result<()> {
    let session = open_session(data_dir)?;
    let chain = session.ledger.chain();

    println!();
    println!("{}", "Recent Blocks:".bold().cyan());
    println!();

    for block in chain.iter().rev().take(count) {
        println!(
            "  {} {} {}",
            format!("#{}", block.header.index).bright_black(),
            block.hash.to_hex()[..16].bright_yellow(),
            format!("({} txs)", block.tx_count()).bright_black()
        );
    }

    println!();
    Ok(())
}

fn show_block_info(data_dir: &Path, block_id: &str) -> Result<()> {
    let session = open_session(data_dir)?;
    let ledger = &session.ledger;

    // Try parsing as index first, then as hash
    let block = if let Ok(index) = block_id.parse::<u64>() {
        ledger.block(index).context("Block not found")?
    } else {
        let hash = Hash::from_hex(block_id)
            .with_context(|| format!("Invalid block hash: {}", block_id))?;
        ledger
            .chain()
            .iter()
            .find(|b| b.hash == hash)
            .context("Block not found")?
    };

    println!();
    println!("{}", "Block Information:".bold().cyan());
    println!();
    println!("  Index:        {}", block.header.index.to_string().bright_cyan());
    println!("  Hash:         {}", block.hash.to_hex().bright_yellow());
    println!(
        "  Prev Hash:    {}",
        block.header.previous_hash.to_hex().bright_black()
    );
    println!(
        "  Merkle Root:  {}",
        block.header.merkle_root.to_hex().bright_black()
    );
    println!(
        "  Timestamp:    {}",
        block.header.timestamp.to_rfc3339().bright_black()
    );
    println!(
        "  Difficulty:   {}",
        block.header.difficulty.to_string().bright_black()
    );
    println!(
        "  Nonce:        {}",
        block.header.nonce.to_string().bright_black()
    );
    println!(
        "  Transactions: {}",
        block.tx_count().to_string().bright_cyan()
    );
    println!();

    if !block.transactions.is_empty() {
        println!("{}", "Transactions:".bold());
        println!();
        for (i, tx) in block.transactions.iter().enumerate() {
            println!(
                "  {} {} {} {} -> {} ({})",
                format!("{}.", i + 1).bright_black(),
                tx.transaction_id.to_string().bright_yellow(),
                tx.data.kind().to_string().bright_cyan(),
                tx.from.as_deref().unwrap_or("-"),
                tx.to,
                tx.amount
            );
        }
        println!();
    }

    Ok(())
}
