//! Database persistence layer for blockledger
//!
//! Blocks live in a single `blocks` table keyed by hash. The tip is kept as an
//! explicit record in `metadata`; the newest-timestamp query is only a fallback
//! for stores written without one.

use crate::error::{ChainError, Result};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const TIP_KEY: &str = "tip";

/// Abstraction for persistence backends. The block store is append-only:
/// `put_block` never replaces an existing hash.
pub trait Persistence: Send + Sync {
    fn put_block(&self, hash: &[u8], serialized: &[u8], timestamp: i64) -> Result<()>;
    fn get_block(&self, hash: &[u8]) -> Result<Option<Vec<u8>>>;
    fn tip(&self) -> Result<Option<Vec<u8>>>;
    fn set_tip(&self, hash: &[u8]) -> Result<()>;
    /// Hash of the block with the greatest timestamp.
    fn tip_candidate(&self) -> Result<Option<Vec<u8>>>;
    fn block_count(&self) -> Result<u64>;

    /// Stores a block and makes it the tip. Backends that can should do both atomically.
    fn save_block_and_tip(&self, hash: &[u8], serialized: &[u8], timestamp: i64) -> Result<()> {
        self.put_block(hash, serialized, timestamp)?;
        self.set_tip(hash)
    }

    /// The explicit tip record, or the newest block if none was written.
    fn discover_tip(&self) -> Result<Option<Vec<u8>>> {
        match self.tip()? {
            Some(tip) => Ok(Some(tip)),
            None => self.tip_candidate(),
        }
    }
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| ChainError::StorageIo(format!("Failed to open database: {}", e)))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ChainError::StorageIo(format!("Failed to open database: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS blocks (
                hash BLOB PRIMARY KEY,
                serialized BLOB NOT NULL,
                timestamp INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| ChainError::StorageIo(format!("Failed to create blocks table: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| ChainError::StorageIo(format!("Failed to create metadata table: {}", e)))?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ChainError::StorageIo("Mutex poisoned".to_string()))
    }

    fn insert_block(conn: &Connection, hash: &[u8], serialized: &[u8], timestamp: i64) -> Result<()> {
        conn.execute(
            "INSERT INTO blocks (hash, serialized, timestamp) VALUES (?1, ?2, ?3)",
            params![hash, serialized, timestamp],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref err, _) if err.code == ErrorCode::ConstraintViolation => {
                ChainError::BlockAlreadyExists(hex::encode(hash))
            }
            e => ChainError::StorageIo(format!("Failed to save block: {}", e)),
        })?;
        Ok(())
    }

    fn write_tip(conn: &Connection, hash: &[u8]) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![TIP_KEY, hash],
        )
        .map_err(|e| ChainError::StorageIo(format!("Failed to save tip: {}", e)))?;
        Ok(())
    }
}

impl Persistence for Database {
    fn put_block(&self, hash: &[u8], serialized: &[u8], timestamp: i64) -> Result<()> {
        let conn = self.conn()?;
        Database::insert_block(&conn, hash, serialized, timestamp)
    }

    fn get_block(&self, hash: &[u8]) -> Result<Option<Vec<u8>>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT serialized FROM blocks WHERE hash = ?1",
            params![hash],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| ChainError::StorageIo(format!("Failed to load block: {}", e)))
    }

    fn tip(&self) -> Result<Option<Vec<u8>>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            params![TIP_KEY],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| ChainError::StorageIo(format!("Failed to load tip: {}", e)))
    }

    fn set_tip(&self, hash: &[u8]) -> Result<()> {
        let conn = self.conn()?;
        Database::write_tip(&conn, hash)
    }

    fn tip_candidate(&self) -> Result<Option<Vec<u8>>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT hash FROM blocks ORDER BY timestamp DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| ChainError::StorageIo(format!("Failed to query newest block: {}", e)))
    }

    fn block_count(&self) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))
            .map_err(|e| ChainError::StorageIo(format!("Failed to count blocks: {}", e)))?;
        Ok(count as u64)
    }

    /// Writes the block row and the tip record in one SQLite transaction.
    fn save_block_and_tip(&self, hash: &[u8], serialized: &[u8], timestamp: i64) -> Result<()> {
        let conn = self.conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| ChainError::StorageIo(format!("Failed to start transaction: {}", e)))?;

        Database::insert_block(&tx, hash, serialized, timestamp)?;
        Database::write_tip(&tx, hash)?;

        tx.commit()
            .map_err(|e| ChainError::StorageIo(format!("Failed to commit transaction: {}", e)))?;
        Ok(())
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral runs.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    blocks: Arc<Mutex<HashMap<Vec<u8>, (Vec<u8>, i64)>>>,
    tip: Arc<Mutex<Option<Vec<u8>>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    fn blocks(&self) -> Result<MutexGuard<'_, HashMap<Vec<u8>, (Vec<u8>, i64)>>> {
        self.blocks
            .lock()
            .map_err(|_| ChainError::StorageIo("Mutex poisoned".to_string()))
    }

    fn tip_slot(&self) -> Result<MutexGuard<'_, Option<Vec<u8>>>> {
        self.tip
            .lock()
            .map_err(|_| ChainError::StorageIo("Mutex poisoned".to_string()))
    }
}

impl Persistence for InMemoryPersistence {
    fn put_block(&self, hash: &[u8], serialized: &[u8], timestamp: i64) -> Result<()> {
        let mut blocks = self.blocks()?;
        if blocks.contains_key(hash) {
            return Err(ChainError::BlockAlreadyExists(hex::encode(hash)));
        }
        blocks.insert(hash.to_vec(), (serialized.to_vec(), timestamp));
        Ok(())
    }

    fn get_block(&self, hash: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.blocks()?.get(hash).map(|(serialized, _)| serialized.clone()))
    }

    fn tip(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.tip_slot()?.clone())
    }

    fn set_tip(&self, hash: &[u8]) -> Result<()> {
        *self.tip_slot()? = Some(hash.to_vec());
        Ok(())
    }

    fn tip_candidate(&self) -> Result<Option<Vec<u8>>> {
        Ok(self
            .blocks()?
            .iter()
            .max_by_key(|(_, (_, timestamp))| *timestamp)
            .map(|(hash, _)| hash.clone()))
    }

    fn block_count(&self) -> Result<u64> {
        Ok(self.blocks()?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backends() -> Vec<Box<dyn Persistence>> {
        vec![
            Box::new(Database::open_in_memory().unwrap()),
            Box::new(InMemoryPersistence::new()),
        ]
    }

    #[test]
    fn test_database_open() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.conn.lock().unwrap().is_autocommit());
        assert_eq!(db.block_count().unwrap(), 0);
    }

    #[test]
    fn test_put_and_get_block() {
        for store in backends() {
            store.put_block(&[1; 32], b"block-one", 100).unwrap();
            assert_eq!(store.get_block(&[1; 32]).unwrap(), Some(b"block-one".to_vec()));
            assert_eq!(store.get_block(&[2; 32]).unwrap(), None);
            assert_eq!(store.block_count().unwrap(), 1);
        }
    }

    #[test]
    fn test_store_is_append_only() {
        for store in backends() {
            store.put_block(&[1; 32], b"original", 100).unwrap();
            let err = store.put_block(&[1; 32], b"replacement", 200).unwrap_err();
            assert!(matches!(err, ChainError::BlockAlreadyExists(_)));
            assert_eq!(store.get_block(&[1; 32]).unwrap(), Some(b"original".to_vec()));
        }
    }

    #[test]
    fn test_tip_candidate_is_newest_timestamp() {
        for store in backends() {
            assert_eq!(store.tip_candidate().unwrap(), None);
            store.put_block(&[1; 32], b"a", 100).unwrap();
            store.put_block(&[3; 32], b"c", 300).unwrap();
            store.put_block(&[2; 32], b"b", 200).unwrap();
            assert_eq!(store.tip_candidate().unwrap(), Some(vec![3; 32]));
        }
    }

    #[test]
    fn test_explicit_tip_wins_over_candidate() {
        for store in backends() {
            store.put_block(&[1; 32], b"a", 100).unwrap();
            store.put_block(&[2; 32], b"b", 200).unwrap();
            assert_eq!(store.discover_tip().unwrap(), Some(vec![2; 32]));

            store.set_tip(&[1; 32]).unwrap();
            assert_eq!(store.tip().unwrap(), Some(vec![1; 32]));
            assert_eq!(store.discover_tip().unwrap(), Some(vec![1; 32]));
        }
    }

    #[test]
    fn test_save_block_and_tip_is_atomic() {
        let db = Database::open_in_memory().unwrap();
        db.save_block_and_tip(&[1; 32], b"a", 100).unwrap();
        assert_eq!(db.tip().unwrap(), Some(vec![1; 32]));

        // A rejected insert must leave the tip where it was.
        db.set_tip(&[9; 32]).unwrap();
        assert!(db.save_block_and_tip(&[1; 32], b"dup", 200).is_err());
        assert_eq!(db.tip().unwrap(), Some(vec![9; 32]));
        assert_eq!(db.block_count().unwrap(), 1);
    }
}
