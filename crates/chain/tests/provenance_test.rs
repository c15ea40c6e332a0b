use herdledger_chain::{
    certificate_hash, Ledger, LedgerConfig, LedgerHandle, Provenance, ProvenanceError,
    VerificationFailure,
};
use herdledger_core::{AnimalRecord, Payload, Transaction};
use herdledger_storage::{ChainStore, Storage};
use std::collections::{BTreeMap, HashSet};

fn test_config() -> LedgerConfig {
    LedgerConfig {
        difficulty: 1,
        mining_reward: 50,
        ..LedgerConfig::default()
    }
}

#[test]
fn test_end_to_end_record_to_certificate() {
    let mut ledger = Ledger::new(test_config()).unwrap();

    let record = AnimalRecord::new("A1")
        .with_breed("Sahiwal")
        .with_owner("Meena")
        .with_location("Haryana");
    ledger.create_animal_record(record, "owner1");
    ledger.approve_animal_record("A1", "sup1");
    ledger.seal_pending_block("miner1").unwrap();

    assert!(ledger.verify("A1").is_verified());
    let certificate = ledger.certificate("A1").unwrap();
    assert_eq!(
        certificate.certificate_hash,
        certificate_hash("A1", &certificate.verification)
    );
    assert_eq!(ledger.balance_of("miner1"), 50);
    assert!(ledger.is_valid());
}

#[test]
fn test_provenance_across_three_blocks() {
    let mut ledger = Ledger::new(test_config()).unwrap();

    ledger.create_animal_record(AnimalRecord::new("A1"), "owner1");
    ledger.seal_pending_block("miner1").unwrap();

    let mut updates = BTreeMap::new();
    updates.insert("breed".to_string(), "Tharparkar".to_string());
    ledger.update_animal_record("A1", updates, "owner1");
    ledger.seal_pending_block("miner1").unwrap();

    ledger.approve_animal_record("A1", "sup1");
    ledger.seal_pending_block("miner1").unwrap();

    let history = ledger.history("A1");
    assert_eq!(history.len(), 3);
    assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    let blocks: HashSet<u64> = history.iter().map(|e| e.block_index).collect();
    assert_eq!(blocks.len(), 3);

    let verification = ledger.verify("A1").verification().cloned().unwrap();
    assert_eq!(verification.entry_count, 3);
    assert_eq!(verification.last_update, history[2].timestamp);
}

#[test]
fn test_certificate_gating() {
    let mut ledger = Ledger::new(test_config()).unwrap();

    assert_eq!(
        ledger.certificate("ghost"),
        Err(ProvenanceError::InvalidRecord {
            animal_id: "ghost".into(),
            reason: VerificationFailure::NoRecord,
        })
    );

    ledger.create_animal_record(AnimalRecord::new("A1"), "owner1");
    ledger.seal_pending_block("miner1").unwrap();
    assert!(ledger.certificate("A1").is_err());

    ledger.approve_animal_record("A1", "sup1");
    ledger.seal_pending_block("miner1").unwrap();

    let first = ledger.certificate("A1").unwrap();
    let second = ledger.certificate("A1").unwrap();
    assert_eq!(first.certificate_hash, second.certificate_hash);
}

#[test]
fn test_balance_conservation_without_rewards() {
    let mut ledger = Ledger::new(test_config()).unwrap();
    let parties = ["alice", "bob", "carol"];

    ledger.submit_transaction(Transaction::transfer("alice", "bob", 40, Payload::MiningReward));
    ledger.submit_transaction(Transaction::transfer("bob", "carol", 15, Payload::MiningReward));
    ledger.submit_transaction(Transaction::transfer("carol", "alice", 5, Payload::MiningReward));
    ledger.seal_pending_block("miner1").unwrap();

    let total: i128 = parties.iter().map(|p| ledger.balance_of(p)).sum();
    assert_eq!(total, 0);
}

#[test]
fn test_ledger_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = ChainStore::new(Storage::open(dir.path()).unwrap());
        let mut ledger = Ledger::open(store.clone(), test_config()).unwrap();
        ledger.create_animal_record(AnimalRecord::new("A1"), "owner1");
        ledger.approve_animal_record("A1", "sup1");
        ledger.seal_pending_block("miner1").unwrap();
        ledger.create_animal_record(AnimalRecord::new("B2"), "owner2");
        store.storage().flush().unwrap();
    }

    let store = ChainStore::new(Storage::open(dir.path()).unwrap());
    let mut ledger = Ledger::open(store, test_config()).unwrap();
    assert!(ledger.verify("A1").is_verified());
    assert_eq!(ledger.pending().len(), 1);

    ledger.seal_pending_block("miner1").unwrap();
    assert_eq!(ledger.history("B2").len(), 1);
    assert_eq!(ledger.chain().len(), 3);
}

#[tokio::test]
async fn test_handle_end_to_end() {
    let handle = LedgerHandle::new(Ledger::new(test_config()).unwrap());

    handle
        .create_animal_record(AnimalRecord::new("A1"), "owner1")
        .await;
    handle.approve_animal_record("A1", "sup1").await;
    handle.seal_pending_block("miner1").await.unwrap();

    assert!(handle.certificate("A1").await.is_ok());
    let stats = handle.stats().await;
    assert_eq!(stats.total_blocks, 2);
    assert_eq!(stats.total_transactions, 3);
    assert!(stats.chain_valid);
}
