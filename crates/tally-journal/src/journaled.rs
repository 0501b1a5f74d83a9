use std::path::Path;
use std::sync::Arc;

use tally_ledger::{
    Candidate, CandidateResult, Clock, Command, Election, ElectionPhase, ElectionSnapshot,
    InMemoryLedger, LedgerConfig, LedgerError, LedgerReader, LedgerWriter, Receipt, VoteRecord,
    Voter,
};
use tally_types::{Address, CandidateId, ElectionId};
use tracing::info;

use crate::bus::{EventBus, EventFilter, EventStream};
use crate::error::Result;
use crate::wal::{SyncMode, WriteAheadLog};

/// Configuration for a [`JournaledLedger`].
#[derive(Clone, Debug)]
pub struct JournalConfig {
    pub sync_mode: SyncMode,
    /// Capacity of per-subscriber broadcast channels.
    pub channel_capacity: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::default(),
            channel_capacity: 1024,
        }
    }
}

/// An election ledger whose receipts survive restarts.
///
/// Each accepted command is framed into the journal before it touches
/// in-memory state, then published on the event bus.
pub struct JournaledLedger {
    ledger: InMemoryLedger,
    wal: WriteAheadLog,
    bus: EventBus,
}

impl JournaledLedger {
    /// Open the journal at `path`, replay it, and resume from its head.
    pub fn open(
        path: &Path,
        journal: JournalConfig,
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let wal = WriteAheadLog::open(path, journal.sync_mode)?;
        let recovery = wal.recover()?;
        let recovered = recovery.receipts.len();
        let ledger = InMemoryLedger::from_receipts(config, clock, recovery.receipts)?;

        info!(
            path = %path.display(),
            receipts = recovered,
            discarded_bytes = recovery.discarded_bytes,
            "journal opened"
        );

        Ok(Self {
            ledger,
            wal,
            bus: EventBus::new(journal.channel_capacity),
        })
    }

    pub fn subscribe(&self, filter: EventFilter) -> EventStream {
        self.bus.subscribe(filter)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn path(&self) -> &Path {
        self.wal.path()
    }

    /// The in-memory view, for projections that take a concrete reader.
    pub fn ledger(&self) -> &InMemoryLedger {
        &self.ledger
    }
}

impl LedgerWriter for JournaledLedger {
    fn submit(&self, caller: &Address, command: Command) -> std::result::Result<Receipt, LedgerError> {
        let receipt = self
            .ledger
            .submit_with(caller, command, |receipt| self.wal.append(receipt).map(drop))?;
        self.bus.publish(&receipt);
        Ok(receipt)
    }
}

type LedgerResult<T> = std::result::Result<T, LedgerError>;

impl LedgerReader for JournaledLedger {
    fn authority(&self) -> LedgerResult<Address> {
        self.ledger.authority()
    }

    fn is_paused(&self) -> LedgerResult<bool> {
        self.ledger.is_paused()
    }

    fn election_count(&self) -> LedgerResult<u64> {
        self.ledger.election_count()
    }

    fn election(&self, id: ElectionId) -> LedgerResult<Option<Election>> {
        self.ledger.election(id)
    }

    fn elections(&self) -> LedgerResult<Vec<Election>> {
        self.ledger.elections()
    }

    fn candidate_count(&self, election_id: ElectionId) -> LedgerResult<u64> {
        self.ledger.candidate_count(election_id)
    }

    fn candidate(
        &self,
        election_id: ElectionId,
        candidate_id: CandidateId,
    ) -> LedgerResult<Option<Candidate>> {
        self.ledger.candidate(election_id, candidate_id)
    }

    fn voter(&self, address: &Address) -> LedgerResult<Option<Voter>> {
        self.ledger.voter(address)
    }

    fn has_voted(&self, election_id: ElectionId, address: &Address) -> LedgerResult<bool> {
        self.ledger.has_voted(election_id, address)
    }

    fn vote_record(
        &self,
        election_id: ElectionId,
        address: &Address,
    ) -> LedgerResult<Option<VoteRecord>> {
        self.ledger.vote_record(election_id, address)
    }

    fn results(&self, election_id: ElectionId) -> LedgerResult<Vec<CandidateResult>> {
        self.ledger.results(election_id)
    }

    fn election_snapshot(&self, election_id: ElectionId) -> LedgerResult<Option<ElectionSnapshot>> {
        self.ledger.election_snapshot(election_id)
    }

    fn phase(&self, election_id: ElectionId) -> LedgerResult<ElectionPhase> {
        self.ledger.phase(election_id)
    }

    fn receipts(&self, from_seq: u64) -> LedgerResult<Vec<Receipt>> {
        self.ledger.receipts(from_seq)
    }

    fn receipt_count(&self) -> LedgerResult<u64> {
        self.ledger.receipt_count()
    }
}
