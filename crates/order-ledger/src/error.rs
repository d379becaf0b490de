//! Ledger errors

use trade_types::TxnNumber;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt log at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("Out of order append: last transaction is {last:?}, got {got}")]
    OutOfOrder { last: Option<TxnNumber>, got: TxnNumber },

    #[error("Transaction {0} not found in log")]
    BaselineNotFound(TxnNumber),
}
