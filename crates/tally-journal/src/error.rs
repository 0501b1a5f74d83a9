use std::io;

use tally_ledger::LedgerError;

/// Errors produced by the journal subsystem.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// I/O error during journal file operations.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The recovered receipt stream could not be replayed.
    #[error("journal replay failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("journal writer lock poisoned")]
    Poisoned,
}

/// Convenience alias used throughout the journal crate.
pub type Result<T> = std::result::Result<T, JournalError>;
