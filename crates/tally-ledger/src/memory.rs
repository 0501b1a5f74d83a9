use std::fmt::Display;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tally_types::{Address, CandidateId, ElectionId};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::command::Command;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::receipt::Receipt;
use crate::records::{
    Candidate, CandidateResult, Election, ElectionPhase, ElectionSnapshot, VoteRecord, Voter,
};
use crate::replay::ReplayEngine;
use crate::state::LedgerState;
use crate::traits::{LedgerReader, LedgerWriter};

/// In-memory election ledger for tests, local tools, and embedding.
///
/// One write lock serializes all mutating commands; readers share a read
/// lock and never see a half-applied command.
pub struct InMemoryLedger {
    clock: Arc<dyn Clock>,
    inner: RwLock<LedgerInner>,
}

struct LedgerInner {
    state: LedgerState,
    receipts: Vec<Receipt>,
}

impl InMemoryLedger {
    pub fn new(config: LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: RwLock::new(LedgerInner {
                state: LedgerState::new(config),
                receipts: Vec::new(),
            }),
        }
    }

    pub fn with_system_clock(config: LedgerConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    /// Rebuild a ledger from a previously recorded receipt stream.
    pub fn from_receipts(
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
        receipts: Vec<Receipt>,
    ) -> Result<Self, LedgerError> {
        let replayed = ReplayEngine::replay(config, &receipts)?;
        Ok(Self {
            clock,
            inner: RwLock::new(LedgerInner {
                state: replayed.state,
                receipts,
            }),
        })
    }

    /// Submit a command, running `persist` on the sealed receipt after
    /// validation and before any state change.
    ///
    /// If `persist` fails the command is rejected with
    /// [`LedgerError::Storage`] and the ledger is left untouched.
    pub fn submit_with<F, E>(
        &self,
        caller: &Address,
        command: Command,
        persist: F,
    ) -> Result<Receipt, LedgerError>
    where
        F: FnOnce(&Receipt) -> Result<(), E>,
        E: Display,
    {
        let mut inner = self.write()?;
        let now = self.clock.now();

        let events = match inner.state.plan(caller, &command, now) {
            Ok(events) => events,
            Err(error) => {
                debug!(%caller, command = %command, %error, "command rejected");
                return Err(error);
            }
        };

        let seq = inner.receipts.len() as u64 + 1;
        let prev_hash = inner.receipts.last().map(|r| r.receipt_hash);
        let receipt = Receipt::seal(seq, now, *caller, command, events, prev_hash)?;

        persist(&receipt).map_err(|e| LedgerError::Storage(e.to_string()))?;

        // Planned events always apply to the state they were planned on.
        let mut next = inner.state.clone();
        for event in &receipt.events {
            next.apply(seq, event)?;
        }
        inner.state = next;
        inner.receipts.push(receipt.clone());

        info!(
            seq,
            %caller,
            command = %receipt.command,
            hash = %receipt.short_hash(),
            "command accepted"
        );
        Ok(receipt)
    }

    /// Current time according to the ledger's clock.
    pub fn now(&self) -> tally_types::Timestamp {
        self.clock.now()
    }

    /// Snapshot of the full state.
    pub fn snapshot(&self) -> Result<LedgerState, LedgerError> {
        Ok(self.read()?.state.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerInner>, LedgerError> {
        self.inner.read().map_err(|_| LedgerError::poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerInner>, LedgerError> {
        self.inner.write().map_err(|_| LedgerError::poisoned())
    }
}

impl LedgerWriter for InMemoryLedger {
    fn submit(&self, caller: &Address, command: Command) -> Result<Receipt, LedgerError> {
        self.submit_with(caller, command, |_| Ok::<(), LedgerError>(()))
    }
}

impl LedgerReader for InMemoryLedger {
    fn authority(&self) -> Result<Address, LedgerError> {
        Ok(self.read()?.state.authority())
    }

    fn is_paused(&self) -> Result<bool, LedgerError> {
        Ok(self.read()?.state.is_paused())
    }

    fn election_count(&self) -> Result<u64, LedgerError> {
        Ok(self.read()?.state.elections().len() as u64)
    }

    fn election(&self, id: ElectionId) -> Result<Option<Election>, LedgerError> {
        Ok(self.read()?.state.election(id).cloned())
    }

    fn elections(&self) -> Result<Vec<Election>, LedgerError> {
        Ok(self.read()?.state.elections().to_vec())
    }

    fn candidate_count(&self, election_id: ElectionId) -> Result<u64, LedgerError> {
        let inner = self.read()?;
        inner
            .state
            .candidates(election_id)
            .map(|list| list.len() as u64)
            .ok_or(LedgerError::UnknownElection(election_id))
    }

    fn candidate(
        &self,
        election_id: ElectionId,
        candidate_id: CandidateId,
    ) -> Result<Option<Candidate>, LedgerError> {
        Ok(self.read()?.state.candidate(election_id, candidate_id).cloned())
    }

    fn voter(&self, address: &Address) -> Result<Option<Voter>, LedgerError> {
        Ok(self.read()?.state.voter(address).copied())
    }

    fn has_voted(&self, election_id: ElectionId, address: &Address) -> Result<bool, LedgerError> {
        Ok(self.read()?.state.vote_record(election_id, address).is_some())
    }

    fn vote_record(
        &self,
        election_id: ElectionId,
        address: &Address,
    ) -> Result<Option<VoteRecord>, LedgerError> {
        Ok(self.read()?.state.vote_record(election_id, address).copied())
    }

    fn results(&self, election_id: ElectionId) -> Result<Vec<CandidateResult>, LedgerError> {
        self.read()?
            .state
            .results(election_id)
            .ok_or(LedgerError::UnknownElection(election_id))
    }

    fn phase(&self, election_id: ElectionId) -> Result<ElectionPhase, LedgerError> {
        let inner = self.read()?;
        let now = self.clock.now();
        inner
            .state
            .election(election_id)
            .map(|e| e.phase_at(now))
            .ok_or(LedgerError::UnknownElection(election_id))
    }

    fn election_snapshot(
        &self,
        election_id: ElectionId,
    ) -> Result<Option<ElectionSnapshot>, LedgerError> {
        let inner = self.read()?;
        let now = self.clock.now();
        let Some(election) = inner.state.election(election_id) else {
            return Ok(None);
        };
        Ok(Some(ElectionSnapshot {
            phase: election.phase_at(now),
            results: inner.state.results(election_id).unwrap_or_default(),
            election: election.clone(),
        }))
    }

    fn receipts(&self, from_seq: u64) -> Result<Vec<Receipt>, LedgerError> {
        let inner = self.read()?;
        let start = from_seq.saturating_sub(1) as usize;
        Ok(inner.receipts.get(start..).map(<[Receipt]>::to_vec).unwrap_or_default())
    }

    fn receipt_count(&self) -> Result<u64, LedgerError> {
        Ok(self.read()?.receipts.len() as u64)
    }
}
