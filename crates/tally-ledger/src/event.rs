use std::fmt;

use serde::{Deserialize, Serialize};
use tally_types::{Address, CandidateId, ElectionId, Timestamp};

/// Classification of ledger notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    ElectionCreated,
    CandidateAdded,
    VoterRegistered,
    VoteCast,
    ElectionFinalized,
    Paused,
    Unpaused,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ElectionCreated => "ElectionCreated",
            Self::CandidateAdded => "CandidateAdded",
            Self::VoterRegistered => "VoterRegistered",
            Self::VoteCast => "VoteCast",
            Self::ElectionFinalized => "ElectionFinalized",
            Self::Paused => "Paused",
            Self::Unpaused => "Unpaused",
        };
        write!(f, "{s}")
    }
}

/// Notification emitted by an accepted mutation.
///
/// Events are also the unit of state change: applying the events of a
/// receipt stream in order reproduces the ledger state exactly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    ElectionCreated {
        election_id: ElectionId,
        name: String,
        description: String,
        start_time: Timestamp,
        end_time: Timestamp,
    },
    CandidateAdded {
        election_id: ElectionId,
        candidate_id: CandidateId,
        name: String,
    },
    VoterRegistered {
        voter: Address,
        timestamp: Timestamp,
    },
    VoteCast {
        voter: Address,
        election_id: ElectionId,
        candidate_id: CandidateId,
        timestamp: Timestamp,
    },
    ElectionFinalized {
        election_id: ElectionId,
        total_votes: u64,
    },
    Paused {
        account: Address,
    },
    Unpaused {
        account: Address,
    },
}

impl LedgerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ElectionCreated { .. } => EventKind::ElectionCreated,
            Self::CandidateAdded { .. } => EventKind::CandidateAdded,
            Self::VoterRegistered { .. } => EventKind::VoterRegistered,
            Self::VoteCast { .. } => EventKind::VoteCast,
            Self::ElectionFinalized { .. } => EventKind::ElectionFinalized,
            Self::Paused { .. } => EventKind::Paused,
            Self::Unpaused { .. } => EventKind::Unpaused,
        }
    }

    /// The election this event concerns, if any.
    pub fn election_id(&self) -> Option<ElectionId> {
        match self {
            Self::ElectionCreated { election_id, .. }
            | Self::CandidateAdded { election_id, .. }
            | Self::VoteCast { election_id, .. }
            | Self::ElectionFinalized { election_id, .. } => Some(*election_id),
            Self::VoterRegistered { .. } | Self::Paused { .. } | Self::Unpaused { .. } => None,
        }
    }

    /// One-line human readable description.
    pub fn summary(&self) -> String {
        match self {
            Self::ElectionCreated {
                election_id,
                name,
                start_time,
                end_time,
                ..
            } => format!("election {election_id} \"{name}\" created, votes {start_time}..={end_time}"),
            Self::CandidateAdded {
                election_id,
                candidate_id,
                name,
            } => format!("candidate {candidate_id} \"{name}\" added to election {election_id}"),
            Self::VoterRegistered { voter, .. } => format!("voter {voter} registered"),
            Self::VoteCast {
                voter,
                election_id,
                candidate_id,
                ..
            } => format!("{voter} voted for candidate {candidate_id} in election {election_id}"),
            Self::ElectionFinalized {
                election_id,
                total_votes,
            } => format!("election {election_id} finalized with {total_votes} vote(s)"),
            Self::Paused { account } => format!("paused by {account}"),
            Self::Unpaused { account } => format!("unpaused by {account}"),
        }
    }
}
