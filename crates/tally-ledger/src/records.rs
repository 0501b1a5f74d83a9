use std::fmt;

use serde::{Deserialize, Serialize};
use tally_types::{Address, CandidateId, ElectionId, Timestamp};

/// An election and its running totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    pub id: ElectionId,
    pub name: String,
    pub description: String,
    /// First instant at which votes are accepted.
    pub start_time: Timestamp,
    /// Last instant at which votes are accepted.
    pub end_time: Timestamp,
    pub finalized: bool,
    pub total_votes: u64,
}

impl Election {
    /// Lifecycle phase of this election at `now`.
    pub fn phase_at(&self, now: Timestamp) -> ElectionPhase {
        if self.finalized {
            ElectionPhase::Finalized
        } else if now < self.start_time {
            ElectionPhase::CandidateRegistration
        } else if now <= self.end_time {
            ElectionPhase::Voting
        } else {
            ElectionPhase::Closed
        }
    }

    pub fn accepts_candidates_at(&self, now: Timestamp) -> bool {
        now < self.start_time
    }

    pub fn accepts_votes_at(&self, now: Timestamp) -> bool {
        !self.finalized && self.start_time <= now && now <= self.end_time
    }

    /// Duration of the voting window in seconds.
    pub fn voting_secs(&self) -> u64 {
        self.end_time.saturating_since(self.start_time)
    }
}

/// Per-election lifecycle. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionPhase {
    /// `now < start_time`: the authority may still add candidates.
    CandidateRegistration,
    /// `start_time <= now <= end_time`: registered voters may vote.
    Voting,
    /// `now > end_time`, awaiting finalization by the authority.
    Closed,
    /// Terminal.
    Finalized,
}

impl fmt::Display for ElectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CandidateRegistration => "candidate-registration",
            Self::Voting => "voting",
            Self::Closed => "closed",
            Self::Finalized => "finalized",
        };
        write!(f, "{s}")
    }
}

/// A candidate standing in one election.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub election_id: ElectionId,
    pub id: CandidateId,
    pub name: String,
    pub vote_count: u64,
}

/// Global voter registration. An address registers at most once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub address: Address,
    pub registered: bool,
    pub registered_at: Timestamp,
}

/// The single ballot a voter cast in one election.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub election_id: ElectionId,
    pub voter: Address,
    pub candidate_id: CandidateId,
    pub cast_at: Timestamp,
}

/// An election, its phase and its results, all read at one instant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSnapshot {
    pub election: Election,
    pub phase: ElectionPhase,
    /// Ascending candidate-id order.
    pub results: Vec<CandidateResult>,
}

/// One row of an election's results, in ascending candidate-id order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub candidate_id: CandidateId,
    pub name: String,
    pub vote_count: u64,
}

impl From<&Candidate> for CandidateResult {
    fn from(candidate: &Candidate) -> Self {
        Self {
            candidate_id: candidate.id,
            name: candidate.name.clone(),
            vote_count: candidate.vote_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn election(start: u64, end: u64) -> Election {
        Election {
            id: ElectionId::FIRST,
            name: "E1".into(),
            description: String::new(),
            start_time: Timestamp::from_secs(start),
            end_time: Timestamp::from_secs(end),
            finalized: false,
            total_votes: 0,
        }
    }

    #[test]
    fn phases_follow_the_clock() {
        let e = election(100, 200);
        assert_eq!(e.phase_at(Timestamp::from_secs(99)), ElectionPhase::CandidateRegistration);
        assert_eq!(e.phase_at(Timestamp::from_secs(100)), ElectionPhase::Voting);
        assert_eq!(e.phase_at(Timestamp::from_secs(200)), ElectionPhase::Voting);
        assert_eq!(e.phase_at(Timestamp::from_secs(201)), ElectionPhase::Closed);
    }

    #[test]
    fn finalized_overrides_clock() {
        let mut e = election(100, 200);
        e.finalized = true;
        assert_eq!(e.phase_at(Timestamp::from_secs(150)), ElectionPhase::Finalized);
        assert!(!e.accepts_votes_at(Timestamp::from_secs(150)));
    }

    #[test]
    fn windows_do_not_overlap() {
        let e = election(100, 200);
        for t in 95..105 {
            let now = Timestamp::from_secs(t);
            assert!(!(e.accepts_candidates_at(now) && e.accepts_votes_at(now)));
        }
    }

    #[test]
    fn phase_ordering_is_lifecycle_order() {
        assert!(ElectionPhase::CandidateRegistration < ElectionPhase::Voting);
        assert!(ElectionPhase::Voting < ElectionPhase::Closed);
        assert!(ElectionPhase::Closed < ElectionPhase::Finalized);
    }
}
