use std::fmt;

use serde::{Deserialize, Serialize};
use tally_types::{CandidateId, ElectionId};

/// A state-mutating request. The caller identity travels beside it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    CreateElection {
        name: String,
        description: String,
        duration_days: u64,
    },
    AddCandidate {
        election_id: ElectionId,
        name: String,
    },
    RegisterVoter,
    Vote {
        election_id: ElectionId,
        candidate_id: CandidateId,
    },
    FinalizeElection {
        election_id: ElectionId,
    },
    Pause,
    Unpause,
}

impl Command {
    /// Whether only the ledger authority may submit this command.
    pub fn requires_authority(&self) -> bool {
        matches!(
            self,
            Self::CreateElection { .. }
                | Self::AddCandidate { .. }
                | Self::FinalizeElection { .. }
                | Self::Pause
                | Self::Unpause
        )
    }

    /// Short operation name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateElection { .. } => "create_election",
            Self::AddCandidate { .. } => "add_candidate",
            Self::RegisterVoter => "register_voter",
            Self::Vote { .. } => "vote",
            Self::FinalizeElection { .. } => "finalize_election",
            Self::Pause => "pause",
            Self::Unpause => "unpause",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_commands() {
        assert!(Command::Pause.requires_authority());
        assert!(Command::Unpause.requires_authority());
        assert!(Command::FinalizeElection {
            election_id: ElectionId::FIRST
        }
        .requires_authority());
        assert!(!Command::RegisterVoter.requires_authority());
        assert!(!Command::Vote {
            election_id: ElectionId::FIRST,
            candidate_id: CandidateId::FIRST,
        }
        .requires_authority());
    }
}
