//! Persistence Layer for the order log
//!
//! The log file holds one JSON record per line, oldest first. Every save
//! rewrites the whole file through a temporary sibling and a rename, so a
//! crash mid-write leaves the previous version intact.

use crate::error::LedgerError;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use trade_types::{NodeId, TxnRecord};

/// Durable backing for an [`OrderLedger`](crate::OrderLedger)
pub trait LogStore: Send {
    /// Load every persisted record, oldest first
    fn load(&self) -> Result<Vec<TxnRecord>, LedgerError>;

    /// Replace the persisted log with `records`
    fn save(&mut self, records: &[TxnRecord]) -> Result<(), LedgerError>;
}

/// Line-structured log file keyed by instance id
pub struct FileLogStore {
    path: PathBuf,
}

impl FileLogStore {
    /// Open (creating if needed) the log file of `instance_id` under `dir`
    pub fn open<P: AsRef<Path>>(dir: P, instance_id: NodeId) -> Result<Self, LedgerError> {
        fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(crate::log_file_name(instance_id));
        if !path.exists() {
            File::create(&path)?;
            tracing::info!("Created order log at {:?}", path);
        }
        Ok(Self { path })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("jsonl.tmp")
    }
}

impl LogStore for FileLogStore {
    fn load(&self) -> Result<Vec<TxnRecord>, LedgerError> {
        let file = File::open(&self.path)?;
        let mut records = Vec::new();

        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: TxnRecord =
                serde_json::from_str(&line).map_err(|e| LedgerError::Corrupt {
                    line: idx + 1,
                    reason: e.to_string(),
                })?;
            records.push(record);
        }

        Ok(records)
    }

    fn save(&mut self, records: &[TxnRecord]) -> Result<(), LedgerError> {
        let temp_path = self.temp_path();
        {
            let mut writer = BufWriter::new(File::create(&temp_path)?);
            for record in records {
                serde_json::to_writer(&mut writer, record).map_err(std::io::Error::from)?;
                writer.write_all(b"\n")?;
            }
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

/// In-memory store. Clones share the same contents, which lets tests
/// reopen a ledger over the "persisted" state to simulate a restart.
#[derive(Clone, Default)]
pub struct MemoryLogStore {
    records: Arc<Mutex<Vec<TxnRecord>>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current persisted contents
    pub fn contents(&self) -> Vec<TxnRecord> {
        self.records.lock().clone()
    }
}

impl LogStore for MemoryLogStore {
    fn load(&self) -> Result<Vec<TxnRecord>, LedgerError> {
        Ok(self.records.lock().clone())
    }

    fn save(&mut self, records: &[TxnRecord]) -> Result<(), LedgerError> {
        *self.records.lock() = records.to_vec();
        Ok(())
    }
}
