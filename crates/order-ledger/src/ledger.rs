//! Order ledger: in-memory log mirrored to a [`LogStore`]
//!
//! One mutex guards the records, the counter and the store. Every
//! operation takes it for its whole duration; nothing here blocks on the
//! network, so holding it across the disk write is fine.

use crate::error::LedgerError;
use crate::persistence::LogStore;
use parking_lot::Mutex;
use trade_types::{OrderType, TxnNumber, TxnRecord};

struct LedgerInner {
    records: Vec<TxnRecord>,
    /// Highest transaction number applied (or handed out, on the leader)
    counter: Option<TxnNumber>,
    store: Box<dyn LogStore>,
}

impl LedgerInner {
    fn last(&self) -> Option<TxnNumber> {
        self.records.last().map(|r| r.txn_number)
    }

    fn next_number(&mut self) -> TxnNumber {
        let next = self.counter.unwrap_or(0) + 1;
        self.counter = Some(next);
        next
    }

    fn bump_counter(&mut self, applied: TxnNumber) {
        if self.counter.map_or(true, |c| c < applied) {
            self.counter = Some(applied);
        }
    }

    /// Push then persist; on a failed persist the push is undone so memory
    /// never runs ahead of disk.
    fn push_persisted(&mut self, record: TxnRecord) -> Result<(), LedgerError> {
        let last = self.last();
        if last.map_or(false, |l| record.txn_number <= l) {
            return Err(LedgerError::OutOfOrder {
                last,
                got: record.txn_number,
            });
        }

        self.records.push(record);
        if let Err(e) = self.store.save(&self.records) {
            self.records.pop();
            return Err(e);
        }
        Ok(())
    }
}

/// Thread-safe, durable transaction log of one order node
pub struct OrderLedger {
    inner: Mutex<LedgerInner>,
}

impl OrderLedger {
    /// Replay `store` into memory and seed the counter from its tail
    pub fn open(store: impl LogStore + 'static) -> Result<Self, LedgerError> {
        let records = store.load()?;

        for (idx, pair) in records.windows(2).enumerate() {
            if pair[1].txn_number <= pair[0].txn_number {
                return Err(LedgerError::Corrupt {
                    line: idx + 2,
                    reason: format!(
                        "transaction {} follows {}",
                        pair[1].txn_number, pair[0].txn_number
                    ),
                });
            }
        }

        let counter = records.last().map(|r| r.txn_number);
        tracing::info!(
            "Loaded {} transactions from order log (last: {:?})",
            records.len(),
            counter
        );

        Ok(Self {
            inner: Mutex::new(LedgerInner {
                records,
                counter,
                store: Box::new(store),
            }),
        })
    }

    /// Increment the counter and return the new value
    ///
    /// Only the leader calls this, and only once the catalog confirmed the
    /// trade.
    pub fn next_transaction_number(&self) -> TxnNumber {
        self.inner.lock().next_number()
    }

    /// Append `record` at the tail and persist the whole log
    ///
    /// The record's number must be above the current tail.
    pub fn append(&self, record: TxnRecord) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock();
        let number = record.txn_number;
        inner.push_persisted(record)?;
        inner.bump_counter(number);
        Ok(())
    }

    /// Append a recovered suffix with a single persist
    ///
    /// Records at or below the current tail are skipped; the rest must be
    /// strictly increasing. Returns how many records were appended.
    pub fn append_batch(&self, records: Vec<TxnRecord>) -> Result<usize, LedgerError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let before = inner.records.len();
        let mut last = inner.last();

        for record in records {
            if last.map_or(false, |l| record.txn_number <= l) {
                tracing::debug!("Skipping already applied transaction {}", record.txn_number);
                continue;
            }
            last = Some(record.txn_number);
            inner.records.push(record);
        }

        let appended = inner.records.len() - before;
        if appended == 0 {
            return Ok(0);
        }

        if let Err(e) = inner.store.save(&inner.records) {
            inner.records.truncate(before);
            return Err(e);
        }
        if let Some(last) = last {
            inner.bump_counter(last);
        }
        Ok(appended)
    }

    /// Leader commit: number, append and persist under one lock
    ///
    /// Returns the new record and the tail number it follows (`None` for
    /// the very first transaction).
    pub fn commit(
        &self,
        stock_name: &str,
        order_type: OrderType,
        quantity: u32,
    ) -> Result<(TxnRecord, Option<TxnNumber>), LedgerError> {
        let mut inner = self.inner.lock();
        let previous = inner.last();
        let saved_counter = inner.counter;
        let record = TxnRecord {
            txn_number: inner.next_number(),
            stock_name: stock_name.to_string(),
            order_type,
            quantity,
        };

        if let Err(e) = inner.push_persisted(record.clone()) {
            inner.counter = saved_counter;
            return Err(e);
        }
        Ok((record, previous))
    }

    /// Number of the tail record, `None` when the log is empty
    pub fn last_transaction_number(&self) -> Option<TxnNumber> {
        self.inner.lock().last()
    }

    /// Linear scan for the record numbered `number`
    pub fn find_by_number(&self, number: TxnNumber) -> Option<TxnRecord> {
        self.inner
            .lock()
            .records
            .iter()
            .find(|r| r.txn_number == number)
            .cloned()
    }

    /// Every record after `baseline`; the whole log when `baseline` is `None`
    pub fn records_after(&self, baseline: Option<TxnNumber>) -> Result<Vec<TxnRecord>, LedgerError> {
        let inner = self.inner.lock();
        let Some(baseline) = baseline else {
            return Ok(inner.records.clone());
        };

        let index = inner
            .records
            .iter()
            .position(|r| r.txn_number == baseline)
            .ok_or(LedgerError::BaselineNotFound(baseline))?;
        Ok(inner.records[index + 1..].to_vec())
    }

    /// Current counter value
    pub fn counter(&self) -> Option<TxnNumber> {
        self.inner.lock().counter
    }

    /// Copy of the whole log
    pub fn snapshot(&self) -> Vec<TxnRecord> {
        self.inner.lock().records.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{FileLogStore, MemoryLogStore};
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn record(n: TxnNumber, name: &str) -> TxnRecord {
        TxnRecord {
            txn_number: n,
            stock_name: name.to_string(),
            order_type: OrderType::Buy,
            quantity: 1,
        }
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = OrderLedger::open(MemoryLogStore::new()).unwrap();
        assert!(ledger.is_empty());
        assert_eq!(ledger.last_transaction_number(), None);
        assert_eq!(ledger.counter(), None);
        assert_eq!(ledger.find_by_number(1), None);
    }

    #[test]
    fn test_next_number_strictly_increases_across_threads() {
        let ledger = Arc::new(OrderLedger::open(MemoryLogStore::new()).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| ledger.next_transaction_number())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            let numbers = handle.join().unwrap();
            assert!(numbers.windows(2).all(|w| w[0] < w[1]));
            for n in numbers {
                assert!(seen.insert(n), "duplicate number {n}");
            }
        }
        assert_eq!(seen.len(), 800);
        assert_eq!(ledger.counter(), Some(800));
    }

    #[test]
    fn test_commit_first_and_following() {
        let ledger = OrderLedger::open(MemoryLogStore::new()).unwrap();

        let (first, prev) = ledger.commit("FishCo", OrderType::Buy, 3).unwrap();
        assert_eq!(first.txn_number, 1);
        assert_eq!(prev, None);

        let (second, prev) = ledger.commit("BoarCo", OrderType::Sell, 2).unwrap();
        assert_eq!(second.txn_number, 2);
        assert_eq!(prev, Some(1));

        assert_eq!(ledger.find_by_number(2), Some(second));
        assert_eq!(ledger.last_transaction_number(), Some(2));
    }

    #[test]
    fn test_restart_recovers_identical_log() {
        let dir = tempdir().unwrap();
        let before = {
            let ledger = OrderLedger::open(FileLogStore::open(dir.path(), 1).unwrap()).unwrap();
            ledger.commit("FishCo", OrderType::Buy, 3).unwrap();
            ledger.commit("MenhirCo", OrderType::Sell, 7).unwrap();
            ledger.append(record(5, "BoarCo")).unwrap();
            ledger.snapshot()
        };

        let reopened = OrderLedger::open(FileLogStore::open(dir.path(), 1).unwrap()).unwrap();
        assert_eq!(reopened.snapshot(), before);
        assert_eq!(reopened.counter(), Some(5));
        assert_eq!(reopened.next_transaction_number(), 6);
    }

    #[test]
    fn test_append_rejects_duplicates_and_regressions() {
        let ledger = OrderLedger::open(MemoryLogStore::new()).unwrap();
        ledger.append(record(1, "a")).unwrap();
        ledger.append(record(3, "b")).unwrap();

        assert!(matches!(
            ledger.append(record(3, "c")),
            Err(LedgerError::OutOfOrder { last: Some(3), got: 3 })
        ));
        assert!(matches!(
            ledger.append(record(2, "c")),
            Err(LedgerError::OutOfOrder { .. })
        ));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_append_updates_counter() {
        let ledger = OrderLedger::open(MemoryLogStore::new()).unwrap();
        ledger.append(record(4, "a")).unwrap();
        assert_eq!(ledger.counter(), Some(4));
        assert_eq!(ledger.next_transaction_number(), 5);
    }

    #[test]
    fn test_append_batch_skips_applied() {
        let store = MemoryLogStore::new();
        let ledger = OrderLedger::open(store.clone()).unwrap();
        ledger.append(record(1, "a")).unwrap();
        ledger.append(record(2, "b")).unwrap();

        let appended = ledger
            .append_batch(vec![record(2, "b"), record(3, "c"), record(4, "d")])
            .unwrap();

        assert_eq!(appended, 2);
        assert_eq!(ledger.counter(), Some(4));
        assert_eq!(store.contents(), ledger.snapshot());
        assert_eq!(ledger.append_batch(vec![record(1, "a")]).unwrap(), 0);
    }

    #[test]
    fn test_records_after() {
        let ledger = OrderLedger::open(MemoryLogStore::new()).unwrap();
        for n in 1..=4 {
            ledger.append(record(n, "x")).unwrap();
        }

        let tail: Vec<_> = ledger
            .records_after(Some(2))
            .unwrap()
            .iter()
            .map(|r| r.txn_number)
            .collect();
        assert_eq!(tail, vec![3, 4]);
        assert!(ledger.records_after(Some(4)).unwrap().is_empty());
        assert_eq!(ledger.records_after(None).unwrap().len(), 4);
        assert!(matches!(
            ledger.records_after(Some(9)),
            Err(LedgerError::BaselineNotFound(9))
        ));
    }

    #[test]
    fn test_open_rejects_unordered_log() {
        let mut store = MemoryLogStore::new();
        store.save(&[record(2, "a"), record(1, "b")]).unwrap();

        assert!(matches!(
            OrderLedger::open(store),
            Err(LedgerError::Corrupt { line: 2, .. })
        ));
    }
}
