//! Read-only ledger queries.

use super::{open_session, print_json};
use anyhow::{Context, Result};
use colored::Colorize;
use herdledger_chain::{Provenance, RecordStatus, VerificationResult};
use std::path::Path;

pub fn balance(data_dir: &Path, address: &str) -> Result<()> {
    let session = open_session(data_dir)?;
    let balance = session.ledger.balance_of(address);

    println!(
        "{}: {}",
        address.bright_yellow(),
        balance.to_string().bright_cyan()
    );
    Ok(())
}

pub fn history(data_dir: &Path, animal_id: &str) -> Result<()> {
    let session = open_session(data_dir)?;
    print_json(&session.ledger.history(animal_id))
}

pub fn verify(data_dir: &Path, animal_id: &str) -> Result<()> {
    let session = open_session(data_dir)?;
    let result = session.ledger.verify(animal_id);

    match &result {
        VerificationResult::Verified(v) => eprintln!(
            "{}  {} verified ({} events)",
            "✓".green().bold(),
            animal_id.bright_yellow(),
            v.entry_count
        ),
        VerificationResult::Failed(reason) => eprintln!(
            "{}  {}: {}",
            "✗".red().bold(),
            animal_id.bright_yellow(),
            reason
        ),
    }
    print_json(&result)
}

pub fn certificate(data_dir: &Path, animal_id: &str) -> Result<()> {
    let session = open_session(data_dir)?;
    let certificate = session
        .ledger
        .certificate(animal_id)
        .context("Certificate refused")?;
    print_json(&certificate)
}

pub fn status(data_dir: &Path, animal_id: &str) -> Result<()> {
    let session = open_session(data_dir)?;
    let status = session.ledger.current_status(animal_id);

    let label = match status {
        RecordStatus::Unknown => "unknown".bright_black(),
        RecordStatus::Pending => "pending".yellow(),
        RecordStatus::Approved => "approved".green(),
        RecordStatus::Rejected => "rejected".red(),
    };
    println!("{}: {}", animal_id.bright_yellow(), label.bold());
    Ok(())
}

pub fn stats(data_dir: &Path) -> Result<()> {
    let session = open_session(data_dir)?;
    print_json(&session.ledger.stats())
}
