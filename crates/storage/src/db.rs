//! sled database wrapper with serialization helpers.

use herdledger_core::Hash;
use sled::Db;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Invalid genesis: {0}")]
    InvalidGenesis(String),

    #[error("Invalid block: {0}")]
    InvalidBlock(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Attempts made to take the database file lock before giving up.
const OPEN_ATTEMPTS: u32 = 40;
/// Pause between lock attempts.
const OPEN_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Wrapper around sled database with serialization helpers.
///
/// Cloning is cheap and every clone refers to the same database.
#[derive(Clone)]
pub struct Storage {
    db: Db,
}

impl Storage {
    /// Open a database at the given path.
    ///
    /// A dropped handle can keep the file lock for a short while after its
    /// background flusher exits, so a held lock is retried for up to two
    /// seconds before the error is returned.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut attempt = 1;
        loop {
            match sled::open(path) {
                Ok(db) => return Ok(Self { db }),
                Err(e) if attempt < OPEN_ATTEMPTS && is_lock_held(&e) => {
                    attempt += 1;
                    thread::sleep(OPEN_RETRY_DELAY);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Open an in-memory database (for testing).
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Store a serializable value.
    pub fn put<K, V>(&self, key: K, value: &V) -> Result<()>
    where
        K: AsRef<[u8]>,
        V: serde::Serialize + ?Sized,
    {
        let encoded = bincode::serialize(value)?;
        self.db.insert(key, encoded)?;
        Ok(())
    }

    /// Retrieve and deserialize a value.
    pub fn get<K, V>(&self, key: K) -> Result<Option<V>>
    where
        K: AsRef<[u8]>,
        V: serde::de::DeserializeOwned,
    {
        match self.db.get(key)? {
            Some(bytes) => {
                let value = bincode::deserialize(&bytes)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Check if a key exists.
    pub fn contains<K: AsRef<[u8]>>(&self, key: K) -> Result<bool> {
        Ok(self.db.contains_key(key)?)
    }

    /// Apply multiple operations atomically.
    ///
    /// The batch is written through sled's `apply_batch`, so either every
    /// operation lands or none does.
    pub fn batch(&self, operations: Vec<BatchOp>) -> Result<()> {
        let mut batch = sled::Batch::default();
        for op in operations {
            match op {
                BatchOp::Insert { key, value } => batch.insert(key, value),
                BatchOp::Remove { key } => batch.remove(key),
            }
        }
        self.db.apply_batch(batch)?;
        Ok(())
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    // =========================================================================
    // Key Construction Helpers
    // =========================================================================

    /// Create a prefixed key for blocks by index.
    /// Format: "block:index:" + big-endian index, so keys sort by index.
    pub fn block_index_key(index: u64) -> Vec<u8> {
        let mut key = b"block:index:".to_vec();
        key.extend_from_slice(&index.to_be_bytes());
        key
    }

    /// Create a prefixed key for the hash → index pointer.
    /// Format: "block:hash:" + hash_bytes
    pub fn block_hash_key(hash: &Hash) -> Vec<u8> {
        let mut key = b"block:hash:".to_vec();
        key.extend_from_slice(&hash.0);
        key
    }
}

/// sled reports a lock held by another handle as an I/O error.
fn is_lock_held(e: &sled::Error) -> bool {
    match e {
        sled::Error::Io(io) => {
            io.kind() == io::ErrorKind::WouldBlock
                || io.to_string().contains("could not acquire lock")
        }
        _ => false,
    }
}

/// Batch operation for atomic updates.
pub enum BatchOp {
    Insert { key: Vec<u8>, value: Vec<u8> },
    Remove { key: Vec<u8> },
}

impl BatchOp {
    /// Build an insert with a bincode-encoded value.
    pub fn insert<K, V>(key: K, value: &V) -> Result<Self>
    where
        K: Into<Vec<u8>>,
        V: serde::Serialize + ?Sized,
    {
        Ok(BatchOp::Insert {
            key: key.into(),
            value: bincode::serialize(value)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_temporary() {
        let storage = Storage::open_temporary().unwrap();
        assert!(storage.db.is_empty());
    }

    #[test]
    fn test_put_get() {
        let storage = Storage::open_temporary().unwrap();

        storage.put("key1", &42u64).unwrap();

        let value: Option<u64> = storage.get("key1").unwrap();
        assert_eq!(value, Some(42));

        let missing: Option<u64> = storage.get("missing").unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn test_clones_share_database() {
        let storage = Storage::open_temporary().unwrap();
        let other = storage.clone();

        storage.put("shared", &7u64).unwrap();
        let value: Option<u64> = other.get("shared").unwrap();
        assert_eq!(value, Some(7));
    }

    #[test]
    fn test_batch_operations() {
        let storage = Storage::open_temporary().unwrap();
        storage.put("c", &3u64).unwrap();

        let ops = vec![
            BatchOp::insert(b"a".to_vec(), &1u64).unwrap(),
            BatchOp::insert(b"b".to_vec(), &2u64).unwrap(),
            BatchOp::Remove { key: b"c".to_vec() },
        ];
        storage.batch(ops).unwrap();

        let a: u64 = storage.get("a").unwrap().unwrap();
        let b: u64 = storage.get("b").unwrap().unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert!(!storage.contains("c").unwrap());
    }

    #[test]
    fn test_open_waits_for_lock_release() {
        let dir = tempfile::tempdir().unwrap();
        let first = Storage::open(dir.path()).unwrap();
        first.put("height", &3u64).unwrap();
        first.flush().unwrap();

        let holder = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            drop(first);
        });

        let second = Storage::open(dir.path()).unwrap();
        holder.join().unwrap();
        let height: Option<u64> = second.get("height").unwrap();
        assert_eq!(height, Some(3));
    }

    #[test]
    fn test_reopen_after_drop() {
        let dir = tempfile::tempdir().unwrap();
        for value in 0..3u64 {
            let storage = Storage::open(dir.path()).unwrap();
            storage.put("counter", &value).unwrap();
            storage.flush().unwrap();
        }

        let storage = Storage::open(dir.path()).unwrap();
        let counter: Option<u64> = storage.get("counter").unwrap();
        assert_eq!(counter, Some(2));
    }

    #[test]
    fn test_key_construction() {
        let hash = Hash([0xBB; 32]);

        let index_key = Storage::block_index_key(42);
        assert!(index_key.starts_with(b"block:index:"));
        assert!(Storage::block_index_key(1) < Storage::block_index_key(256));

        let hash_key = Storage::block_hash_key(&hash);
        assert!(hash_key.starts_with(b"block:hash:"));
        assert_eq!(hash_key.len(), b"block:hash:".len() + 32);
    }
}
