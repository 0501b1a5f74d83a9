use std::fmt;

use serde::{Deserialize, Serialize};
use tally_types::{Address, CandidateId, ElectionId};

/// Errors produced by ledger operations.
///
/// Every variant is an ordinary return value: a rejected command leaves
/// the ledger state, the receipt stream, and the notification stream
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("caller {caller} is not the ledger authority")]
    Unauthorized { caller: Address },

    #[error("ledger is paused")]
    SystemPaused,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("election {0} does not exist")]
    UnknownElection(ElectionId),

    #[error("candidate {candidate_id} does not exist in election {election_id}")]
    UnknownCandidate {
        election_id: ElectionId,
        candidate_id: CandidateId,
    },

    #[error("cannot add candidates to election {0} after voting opens")]
    CandidateWindowClosed(ElectionId),

    #[error("voting is not open for election {0}")]
    VotingClosed(ElectionId),

    #[error("election {0} is still active")]
    WindowStillOpen(ElectionId),

    #[error("voter {0} is not registered")]
    VoterNotRegistered(Address),

    #[error("voter {0} is already registered")]
    AlreadyRegistered(Address),

    #[error("voter {voter} already voted in election {election_id}")]
    AlreadyVoted {
        election_id: ElectionId,
        voter: Address,
    },

    #[error("election {0} is already finalized")]
    AlreadyFinalized(ElectionId),

    #[error("integrity violation at seq {seq}: {reason}")]
    IntegrityViolation { seq: u64, reason: String },

    #[error("storage error: {0}")]
    Storage(String),
}

/// Coarse classification of [`LedgerError`] for callers that only need
/// to decide how to report a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    SystemPaused,
    InvalidArgument,
    UnknownEntity,
    WindowClosed,
    WindowStillOpen,
    NotRegistered,
    AlreadyRegistered,
    AlreadyVoted,
    AlreadyFinalized,
    Integrity,
    Storage,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::SystemPaused => ErrorKind::SystemPaused,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::UnknownElection(_) | Self::UnknownCandidate { .. } => ErrorKind::UnknownEntity,
            Self::CandidateWindowClosed(_) | Self::VotingClosed(_) => ErrorKind::WindowClosed,
            Self::WindowStillOpen(_) => ErrorKind::WindowStillOpen,
            Self::VoterNotRegistered(_) => ErrorKind::NotRegistered,
            Self::AlreadyRegistered(_) => ErrorKind::AlreadyRegistered,
            Self::AlreadyVoted { .. } => ErrorKind::AlreadyVoted,
            Self::AlreadyFinalized(_) => ErrorKind::AlreadyFinalized,
            Self::IntegrityViolation { .. } => ErrorKind::Integrity,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn poisoned() -> Self {
        Self::IntegrityViolation {
            seq: 0,
            reason: "ledger lock poisoned".into(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unauthorized => "unauthorized",
            Self::SystemPaused => "system_paused",
            Self::InvalidArgument => "invalid_argument",
            Self::UnknownEntity => "unknown_entity",
            Self::WindowClosed => "window_closed",
            Self::WindowStillOpen => "window_still_open",
            Self::NotRegistered => "not_registered",
            Self::AlreadyRegistered => "already_registered",
            Self::AlreadyVoted => "already_voted",
            Self::AlreadyFinalized => "already_finalized",
            Self::Integrity => "integrity",
            Self::Storage => "storage",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_group_window_errors() {
        let id = ElectionId::FIRST;
        assert_eq!(
            LedgerError::CandidateWindowClosed(id).kind(),
            ErrorKind::WindowClosed
        );
        assert_eq!(LedgerError::VotingClosed(id).kind(), ErrorKind::WindowClosed);
        assert_eq!(
            LedgerError::UnknownCandidate {
                election_id: id,
                candidate_id: CandidateId::FIRST
            }
            .kind(),
            ErrorKind::UnknownEntity
        );
    }

    #[test]
    fn kind_display_matches_serde() {
        let kind = ErrorKind::AlreadyVoted;
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, format!("\"{kind}\""));
    }
}
