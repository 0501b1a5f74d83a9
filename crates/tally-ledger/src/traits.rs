use tally_types::{Address, CandidateId, ElectionId};

use crate::command::Command;
use crate::error::LedgerError;
use crate::receipt::Receipt;
use crate::records::{
    Candidate, CandidateResult, Election, ElectionPhase, ElectionSnapshot, VoteRecord, Voter,
};

/// Write boundary: the submit-style call interface.
///
/// Every call either returns the sealed receipt of an accepted command or
/// a typed error with no effect on state.
pub trait LedgerWriter: Send + Sync {
    fn submit(&self, caller: &Address, command: Command) -> Result<Receipt, LedgerError>;

    fn create_election(
        &self,
        caller: &Address,
        name: &str,
        description: &str,
        duration_days: u64,
    ) -> Result<(ElectionId, Receipt), LedgerError> {
        let receipt = self.submit(
            caller,
            Command::CreateElection {
                name: name.to_string(),
                description: description.to_string(),
                duration_days,
            },
        )?;
        let id = receipt
            .created_election()
            .ok_or_else(|| missing_event(&receipt, "ElectionCreated"))?;
        Ok((id, receipt))
    }

    fn add_candidate(
        &self,
        caller: &Address,
        election_id: ElectionId,
        name: &str,
    ) -> Result<(CandidateId, Receipt), LedgerError> {
        let receipt = self.submit(
            caller,
            Command::AddCandidate {
                election_id,
                name: name.to_string(),
            },
        )?;
        let id = receipt
            .added_candidate()
            .ok_or_else(|| missing_event(&receipt, "CandidateAdded"))?;
        Ok((id, receipt))
    }

    fn register_voter(&self, caller: &Address) -> Result<Receipt, LedgerError> {
        self.submit(caller, Command::RegisterVoter)
    }

    fn vote(
        &self,
        caller: &Address,
        election_id: ElectionId,
        candidate_id: CandidateId,
    ) -> Result<Receipt, LedgerError> {
        self.submit(
            caller,
            Command::Vote {
                election_id,
                candidate_id,
            },
        )
    }

    fn finalize_election(
        &self,
        caller: &Address,
        election_id: ElectionId,
    ) -> Result<Receipt, LedgerError> {
        self.submit(caller, Command::FinalizeElection { election_id })
    }

    fn pause(&self, caller: &Address) -> Result<Receipt, LedgerError> {
        self.submit(caller, Command::Pause)
    }

    fn unpause(&self, caller: &Address) -> Result<Receipt, LedgerError> {
        self.submit(caller, Command::Unpause)
    }
}

/// Read boundary: projections of current state. Reads never observe a
/// write in progress.
pub trait LedgerReader: Send + Sync {
    fn authority(&self) -> Result<Address, LedgerError>;

    fn is_paused(&self) -> Result<bool, LedgerError>;

    fn election_count(&self) -> Result<u64, LedgerError>;

    fn election(&self, id: ElectionId) -> Result<Option<Election>, LedgerError>;

    /// All elections in ascending id order.
    fn elections(&self) -> Result<Vec<Election>, LedgerError>;

    fn candidate_count(&self, election_id: ElectionId) -> Result<u64, LedgerError>;

    fn candidate(
        &self,
        election_id: ElectionId,
        candidate_id: CandidateId,
    ) -> Result<Option<Candidate>, LedgerError>;

    fn voter(&self, address: &Address) -> Result<Option<Voter>, LedgerError>;

    fn has_voted(&self, election_id: ElectionId, address: &Address) -> Result<bool, LedgerError>;

    fn vote_record(
        &self,
        election_id: ElectionId,
        address: &Address,
    ) -> Result<Option<VoteRecord>, LedgerError>;

    /// Every candidate of the election in ascending candidate-id order.
    fn results(&self, election_id: ElectionId) -> Result<Vec<CandidateResult>, LedgerError>;

    /// Phase of the election at the ledger's current time.
    fn phase(&self, election_id: ElectionId) -> Result<ElectionPhase, LedgerError>;

    /// The election, its phase and its results under a single read, so the
    /// totals agree with the per-candidate counts. `None` if unknown.
    fn election_snapshot(
        &self,
        election_id: ElectionId,
    ) -> Result<Option<ElectionSnapshot>, LedgerError>;

    /// Receipts with `seq >= from_seq`, in order.
    fn receipts(&self, from_seq: u64) -> Result<Vec<Receipt>, LedgerError>;

    fn receipt_count(&self) -> Result<u64, LedgerError>;
}

/// A full ledger: both boundaries behind one object.
pub trait ElectionLedger: LedgerReader + LedgerWriter {}

impl<T: LedgerReader + LedgerWriter> ElectionLedger for T {}

fn missing_event(receipt: &Receipt, kind: &str) -> LedgerError {
    LedgerError::IntegrityViolation {
        seq: receipt.seq,
        reason: format!("receipt carries no {kind} event"),
    }
}
