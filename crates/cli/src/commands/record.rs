//! Animal record lifecycle commands.

use super::open_session;
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use herdledger_chain::Provenance;
use herdledger_core::{AnimalRecord, GeoPoint, Transaction};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Args)]
pub struct RecordArgs {
    #[command(subcommand)]
    command: RecordCommand,
}

#[derive(Subcommand)]
enum RecordCommand {
    /// Register a new animal record
    Create {
        /// Animal id
        animal_id: String,

        /// Address of the submitting owner
        #[arg(long)]
        from: String,

        #[arg(long)]
        breed: Option<String>,

        /// Owner name as registered
        #[arg(long)]
        owner: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        age_months: Option<u32>,

        #[arg(long)]
        gender: Option<String>,

        /// Image URL (repeatable)
        #[arg(long = "image")]
        images: Vec<String>,

        /// GPS position as LAT,LNG
        #[arg(long, value_parser = parse_gps, allow_hyphen_values = true)]
        gps: Option<GeoPoint>,
    },
    /// Record field changes to an animal
    Update {
        /// Animal id
        animal_id: String,

        /// Address of the updater
        #[arg(long)]
        from: String,

        /// Field change as KEY=VALUE (repeatable)
        #[arg(long = "set", value_parser = parse_field, required = true)]
        fields: Vec<(String, String)>,
    },
    /// Approve an animal record
    Approve {
        /// Animal id
        animal_id: String,

        /// Address of the approver
        #[arg(long)]
        from: String,
    },
    /// Reject an animal record
    Reject {
        /// Animal id
        animal_id: String,

        /// Address of the rejector
        #[arg(long)]
        from: String,

        /// Reason for rejection
        #[arg(long)]
        reason: String,
    },
}

pub fn run(args: RecordArgs, data_dir: &Path) -> Result<()> {
    let mut session = open_session(data_dir)?;
    let ledger = &mut session.ledger;

    let tx = match args.command {
        RecordCommand::Create {
            animal_id,
            from,
            breed,
            owner,
            location,
            age_months,
            gender,
            images,
            gps,
        } => {
            let mut record = AnimalRecord::new(animal_id);
            record.breed = breed;
            record.owner = owner;
            record.location = location;
            record.metadata.age_months = age_months;
            record.metadata.gender = gender;
            record.metadata.images = images;
            record.metadata.gps = gps;
            ledger.create_animal_record(record, &from)
        }
        RecordCommand::Update {
            animal_id,
            from,
            fields,
        } => {
            let updates: BTreeMap<String, String> = fields.into_iter().collect();
            ledger.update_animal_record(&animal_id, updates, &from)
        }
        RecordCommand::Approve { animal_id, from } => {
            ledger.approve_animal_record(&animal_id, &from)
        }
        RecordCommand::Reject {
            animal_id,
            from,
            reason,
        } => ledger.reject_animal_record(&animal_id, &from, &reason),
    };

    let queued = ledger.pending().contains(&tx.transaction_id);
    let pending = ledger.pending().len();
    session.close()?;

    if !queued {
        bail!("Transaction {} was refused by the ledger", tx.transaction_id);
    }
    print_queued(&tx, pending);
    Ok(())
}

fn print_queued(tx: &Transaction, pending: usize) {
    println!(
        "{}  Queued {} for {}",
        "✓".green().bold(),
        tx.data.kind().to_string().bright_cyan(),
        tx.animal_id().unwrap_or_default().bright_yellow()
    );
    println!(
        "    Transaction: {}",
        tx.transaction_id.to_string().bright_black()
    );
    println!("    Pending:     {}", pending.to_string().bright_cyan());
    println!();
    println!(
        "Run {} to commit pending events.",
        "herdledger seal --beneficiary <address>".bright_cyan()
    );
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

fn parse_gps(s: &str) -> Result<GeoPoint, String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG, got '{}'", s))?;
    let lat: f64 = lat.trim().parse().map_err(|_| format!("invalid latitude '{}'", lat))?;
    let lng: f64 = lng.trim().parse().map_err(|_| format!("invalid longitude '{}'", lng))?;
    Ok(GeoPoint { lat, lng })
}
