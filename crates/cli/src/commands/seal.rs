//! Seal pending transactions command.

use super::{open_session, Session};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use herdledger_chain::LedgerHandle;
use std::path::Path;

#[derive(Args)]
pub struct SealArgs {
    /// Address credited with the mining reward
    #[arg(short, long)]
    beneficiary: String,
}

pub async fn run(args: SealArgs, data_dir: &Path) -> Result<()> {
    let Session { ledger, store } = open_session(data_dir)?;

    let pending = ledger.pending().len();
    println!("{}", "Sealing pending transactions...".bold().cyan());
    println!("  Pending:    {}", pending.to_string().bright_cyan());
    println!(
        "  Difficulty: {}",
        ledger.difficulty().to_string().bright_black()
    );

    let handle = LedgerHandle::new(ledger);
    let block = handle
        .seal_pending_block(args.beneficiary.as_str())
        .await
        .context("Failed to seal block")?;
    store.storage().flush()?;

    println!();
    println!("{}  Block sealed", "✓".green().bold());
    println!("    Index: {}", block.header.index.to_string().bright_cyan());
    println!("    Hash:  {}", block.hash.to_hex().bright_yellow());
    println!("    Nonce: {}", block.header.nonce.to_string().bright_black());
    println!("    Txs:   {}", block.tx_count().to_string().bright_cyan());
    println!(
        "    Reward: {} to {}",
        handle.read().await.mining_reward().to_string().bright_cyan(),
        args.beneficiary.bright_yellow()
    );
    println!();

    Ok(())
}
