//! Durability and notifications for the Tally election ledger.
//!
//! Receipts are framed into a crash-recoverable write-ahead journal before
//! they change in-memory state, and every accepted event is fanned out to
//! filtered subscribers over broadcast channels.

pub mod bus;
pub mod error;
pub mod journaled;
pub mod wal;

pub use bus::{EventBus, EventFilter, EventStream, Notification};
pub use error::JournalError;
pub use journaled::{JournalConfig, JournaledLedger};
pub use wal::{Recovery, SyncMode, WriteAheadLog};
