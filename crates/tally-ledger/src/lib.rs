//! Election ledger for Tally.
//!
//! An append-only, rule-governed state machine: one authority creates
//! time-boxed elections and their candidates, any account registers once
//! and casts at most one vote per election, and results are read at any
//! time. This crate provides:
//! - Commands, events and hash-linked receipts
//! - `LedgerWriter` / `LedgerReader` trait boundaries
//! - `InMemoryLedger` with a write-ahead persistence hook
//! - Deterministic replay of receipt streams
//! - Projection builders (summaries, standings, voter status, audit index)
//! - Stream validation (hash chain, sequence, attribution, tallies)

pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod memory;
pub mod projection;
pub mod receipt;
pub mod records;
pub mod replay;
pub mod state;
pub mod traits;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use command::Command;
pub use config::{LedgerConfig, DEFAULT_CANDIDATE_WINDOW_SECS};
pub use error::{ErrorKind, LedgerError};
pub use event::{EventKind, LedgerEvent};
pub use memory::InMemoryLedger;
pub use projection::{
    AuditIndexEntry, AuditIndexProjection, ElectionSummary, ProjectionBuilder, StandingRow,
    Standings, VoterStatus,
};
pub use receipt::Receipt;
pub use records::{
    Candidate, CandidateResult, Election, ElectionPhase, ElectionSnapshot, VoteRecord, Voter,
};
pub use replay::{ReplayEngine, ReplayResult};
pub use state::{LedgerState, TallyCheck};
pub use traits::{ElectionLedger, LedgerReader, LedgerWriter};
pub use validation::{StreamValidator, ValidationReport, Violation, ViolationKind};
