use serde::{Deserialize, Serialize};
use tally_types::{Address, CandidateId, ElectionId, Timestamp};

use crate::command::Command;
use crate::error::LedgerError;
use crate::event::LedgerEvent;

const RECEIPT_DOMAIN: &[u8] = b"tally-receipt-v1:";

/// Hash-linked record of one accepted command.
///
/// The receipt stream is dense (`seq` starts at 1 with no gaps) and each
/// receipt commits to its predecessor through `prev_hash`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub seq: u64,
    pub timestamp: Timestamp,
    pub caller: Address,
    pub command: Command,
    pub events: Vec<LedgerEvent>,
    pub prev_hash: Option<[u8; 32]>,
    pub receipt_hash: [u8; 32],
}

impl Receipt {
    /// Build a receipt and seal it with its content hash.
    pub fn seal(
        seq: u64,
        timestamp: Timestamp,
        caller: Address,
        command: Command,
        events: Vec<LedgerEvent>,
        prev_hash: Option<[u8; 32]>,
    ) -> Result<Self, LedgerError> {
        let mut receipt = Self {
            seq,
            timestamp,
            caller,
            command,
            events,
            prev_hash,
            receipt_hash: [0; 32],
        };
        receipt.receipt_hash = receipt.compute_hash()?;
        Ok(receipt)
    }

    /// Recompute the content hash over the receipt with a zeroed hash field.
    pub fn compute_hash(&self) -> Result<[u8; 32], LedgerError> {
        let mut canonical = self.clone();
        canonical.receipt_hash = [0; 32];

        let encoded = serde_json::to_vec(&canonical).map_err(|e| LedgerError::IntegrityViolation {
            seq: self.seq,
            reason: format!("receipt serialization failed: {e}"),
        })?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(RECEIPT_DOMAIN);
        hasher.update(&encoded);
        Ok(*hasher.finalize().as_bytes())
    }

    pub fn short_hash(&self) -> String {
        hex::encode(&self.receipt_hash[..6])
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.receipt_hash)
    }

    /// Id of the election this receipt created, if any.
    pub fn created_election(&self) -> Option<ElectionId> {
        self.events.iter().find_map(|event| match event {
            LedgerEvent::ElectionCreated { election_id, .. } => Some(*election_id),
            _ => None,
        })
    }

    /// Id of the candidate this receipt added, if any.
    pub fn added_candidate(&self) -> Option<CandidateId> {
        self.events.iter().find_map(|event| match event {
            LedgerEvent::CandidateAdded { candidate_id, .. } => Some(*candidate_id),
            _ => None,
        })
    }

    /// Whether any event of this receipt concerns `election_id`.
    pub fn touches_election(&self, election_id: ElectionId) -> bool {
        self.events
            .iter()
            .any(|event| event.election_id() == Some(election_id))
    }
}
