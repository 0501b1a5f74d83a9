use std::collections::HashMap;

use tally_types::{Address, CandidateId, ElectionId, Timestamp};

use crate::command::Command;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::event::LedgerEvent;
use crate::records::{Candidate, CandidateResult, Election, VoteRecord, Voter};

/// Complete ledger state.
///
/// Elections and their candidates live in dense arenas indexed by
/// `id - 1`; candidates refer to their election by id only. State changes
/// happen exclusively through [`LedgerState::apply`], which is shared by
/// the live path and by replay.
#[derive(Clone, Debug)]
pub struct LedgerState {
    config: LedgerConfig,
    paused: bool,
    elections: Vec<Election>,
    candidates: Vec<Vec<Candidate>>,
    voters: HashMap<Address, Voter>,
    votes: HashMap<(ElectionId, Address), VoteRecord>,
}

/// Per-election comparison of the three places a vote is counted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TallyCheck {
    pub election_id: ElectionId,
    pub total_votes: u64,
    pub candidate_sum: u64,
    pub record_count: u64,
}

impl TallyCheck {
    pub fn is_consistent(&self) -> bool {
        self.total_votes == self.candidate_sum && self.total_votes == self.record_count
    }
}

impl LedgerState {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            paused: false,
            elections: Vec::new(),
            candidates: Vec::new(),
            voters: HashMap::new(),
            votes: HashMap::new(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn authority(&self) -> Address {
        self.config.authority
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn elections(&self) -> &[Election] {
        &self.elections
    }

    pub fn election(&self, id: ElectionId) -> Option<&Election> {
        id.index().and_then(|i| self.elections.get(i))
    }

    /// Candidates of an election in ascending id order.
    pub fn candidates(&self, election_id: ElectionId) -> Option<&[Candidate]> {
        election_id
            .index()
            .and_then(|i| self.candidates.get(i))
            .map(Vec::as_slice)
    }

    pub fn candidate(&self, election_id: ElectionId, candidate_id: CandidateId) -> Option<&Candidate> {
        self.candidates(election_id)
            .and_then(|list| candidate_id.index().and_then(|i| list.get(i)))
    }

    pub fn voter(&self, address: &Address) -> Option<&Voter> {
        self.voters.get(address)
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }

    pub fn is_registered(&self, address: &Address) -> bool {
        self.voters.get(address).is_some_and(|v| v.registered)
    }

    pub fn vote_record(&self, election_id: ElectionId, voter: &Address) -> Option<&VoteRecord> {
        self.votes.get(&(election_id, *voter))
    }

    /// Results of an election, one row per candidate in ascending id order.
    pub fn results(&self, election_id: ElectionId) -> Option<Vec<CandidateResult>> {
        self.candidates(election_id)
            .map(|list| list.iter().map(CandidateResult::from).collect())
    }

    /// Validate `command` from `caller` at `now` and return the events it
    /// would produce. Never mutates.
    pub fn plan(
        &self,
        caller: &Address,
        command: &Command,
        now: Timestamp,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        match command {
            Command::CreateElection {
                name,
                description,
                duration_days,
            } => {
                self.require_authority(caller)?;
                self.require_unpaused()?;
                require_text(name, "election name")?;
                if *duration_days == 0 {
                    return Err(LedgerError::InvalidArgument(
                        "duration must be greater than 0".into(),
                    ));
                }
                let start_time = now
                    .checked_add_secs(self.config.candidate_window_secs)
                    .and_then(|start| start.checked_add_days(*duration_days).map(|end| (start, end)));
                let Some((start_time, end_time)) = start_time else {
                    return Err(LedgerError::InvalidArgument(
                        "duration exceeds the timestamp range".into(),
                    ));
                };

                Ok(vec![LedgerEvent::ElectionCreated {
                    election_id: ElectionId::after(self.elections.len()),
                    name: name.clone(),
                    description: description.clone(),
                    start_time,
                    end_time,
                }])
            }

            Command::AddCandidate { election_id, name } => {
                self.require_authority(caller)?;
                self.require_unpaused()?;
                let election = self.election(*election_id).ok_or_else(|| {
                    LedgerError::InvalidArgument(format!("election {election_id} does not exist"))
                })?;
                if !election.accepts_candidates_at(now) {
                    return Err(LedgerError::CandidateWindowClosed(*election_id));
                }
                require_text(name, "candidate name")?;

                let existing = self.candidates(*election_id).map_or(0, <[Candidate]>::len);
                Ok(vec![LedgerEvent::CandidateAdded {
                    election_id: *election_id,
                    candidate_id: CandidateId::after(existing),
                    name: name.clone(),
                }])
            }

            Command::RegisterVoter => {
                self.require_unpaused()?;
                if self.is_registered(caller) {
                    return Err(LedgerError::AlreadyRegistered(*caller));
                }
                Ok(vec![LedgerEvent::VoterRegistered {
                    voter: *caller,
                    timestamp: now,
                }])
            }

            Command::Vote {
                election_id,
                candidate_id,
            } => {
                self.require_unpaused()?;
                let election = self
                    .election(*election_id)
                    .ok_or(LedgerError::UnknownElection(*election_id))?;
                if !election.accepts_votes_at(now) {
                    return Err(LedgerError::VotingClosed(*election_id));
                }
                if !self.is_registered(caller) {
                    return Err(LedgerError::VoterNotRegistered(*caller));
                }
                if self.vote_record(*election_id, caller).is_some() {
                    return Err(LedgerError::AlreadyVoted {
                        election_id: *election_id,
                        voter: *caller,
                    });
                }
                if self.candidate(*election_id, *candidate_id).is_none() {
                    return Err(LedgerError::UnknownCandidate {
                        election_id: *election_id,
                        candidate_id: *candidate_id,
                    });
                }
                Ok(vec![LedgerEvent::VoteCast {
                    voter: *caller,
                    election_id: *election_id,
                    candidate_id: *candidate_id,
                    timestamp: now,
                }])
            }

            Command::FinalizeElection { election_id } => {
                self.require_authority(caller)?;
                self.require_unpaused()?;
                let election = self
                    .election(*election_id)
                    .ok_or(LedgerError::UnknownElection(*election_id))?;
                if now <= election.end_time {
                    return Err(LedgerError::WindowStillOpen(*election_id));
                }
                if election.finalized {
                    return Err(LedgerError::AlreadyFinalized(*election_id));
                }
                Ok(vec![LedgerEvent::ElectionFinalized {
                    election_id: *election_id,
                    total_votes: election.total_votes,
                }])
            }

            Command::Pause => {
                self.require_authority(caller)?;
                Ok(vec![LedgerEvent::Paused { account: *caller }])
            }

            Command::Unpause => {
                self.require_authority(caller)?;
                Ok(vec![LedgerEvent::Unpaused { account: *caller }])
            }
        }
    }

    /// Apply one accepted event. All checks run before the first write, so
    /// an event is either applied in full or not at all.
    pub fn apply(&mut self, seq: u64, event: &LedgerEvent) -> Result<(), LedgerError> {
        let violation = |reason: String| LedgerError::IntegrityViolation { seq, reason };

        match event {
            LedgerEvent::ElectionCreated {
                election_id,
                name,
                description,
                start_time,
                end_time,
            } => {
                let expected = ElectionId::after(self.elections.len());
                if *election_id != expected {
                    return Err(violation(format!(
                        "expected election {expected}, found {election_id}"
                    )));
                }
                if end_time <= start_time {
                    return Err(violation(format!(
                        "election {election_id} ends before it starts"
                    )));
                }
                self.elections.push(Election {
                    id: *election_id,
                    name: name.clone(),
                    description: description.clone(),
                    start_time: *start_time,
                    end_time: *end_time,
                    finalized: false,
                    total_votes: 0,
                });
                self.candidates.push(Vec::new());
            }

            LedgerEvent::CandidateAdded {
                election_id,
                candidate_id,
                name,
            } => {
                let list = election_id
                    .index()
                    .and_then(|i| self.candidates.get_mut(i))
                    .ok_or_else(|| violation(format!("candidate for unknown election {election_id}")))?;
                let expected = CandidateId::after(list.len());
                if *candidate_id != expected {
                    return Err(violation(format!(
                        "expected candidate {expected}, found {candidate_id}"
                    )));
                }
                list.push(Candidate {
                    election_id: *election_id,
                    id: *candidate_id,
                    name: name.clone(),
                    vote_count: 0,
                });
            }

            LedgerEvent::VoterRegistered { voter, timestamp } => {
                if self.is_registered(voter) {
                    return Err(violation(format!("voter {voter} registered twice")));
                }
                self.voters.insert(
                    *voter,
                    Voter {
                        address: *voter,
                        registered: true,
                        registered_at: *timestamp,
                    },
                );
            }

            LedgerEvent::VoteCast {
                voter,
                election_id,
                candidate_id,
                timestamp,
            } => {
                let key = (*election_id, *voter);
                if self.votes.contains_key(&key) {
                    return Err(violation(format!(
                        "second vote by {voter} in election {election_id}"
                    )));
                }
                if !self.voters.get(voter).is_some_and(|v| v.registered) {
                    return Err(violation(format!("vote by unregistered voter {voter}")));
                }
                let election = election_id
                    .index()
                    .and_then(|i| self.elections.get_mut(i))
                    .ok_or_else(|| violation(format!("vote in unknown election {election_id}")))?;
                if election.finalized {
                    return Err(violation(format!("vote in finalized election {election_id}")));
                }
                let candidate = election_id
                    .index()
                    .and_then(|i| self.candidates.get_mut(i))
                    .and_then(|list| candidate_id.index().and_then(|i| list.get_mut(i)))
                    .ok_or_else(|| violation(format!("vote for unknown candidate {candidate_id}")))?;
                let (Some(vote_count), Some(total_votes)) = (
                    candidate.vote_count.checked_add(1),
                    election.total_votes.checked_add(1),
                ) else {
                    return Err(violation("vote counter overflow".into()));
                };

                candidate.vote_count = vote_count;
                election.total_votes = total_votes;
                self.votes.insert(
                    key,
                    VoteRecord {
                        election_id: *election_id,
                        voter: *voter,
                        candidate_id: *candidate_id,
                        cast_at: *timestamp,
                    },
                );
            }

            LedgerEvent::ElectionFinalized {
                election_id,
                total_votes,
            } => {
                let election = election_id
                    .index()
                    .and_then(|i| self.elections.get_mut(i))
                    .ok_or_else(|| violation(format!("finalized unknown election {election_id}")))?;
                if election.finalized {
                    return Err(violation(format!("election {election_id} finalized twice")));
                }
                if election.total_votes != *total_votes {
                    return Err(violation(format!(
                        "finalized total {total_votes} differs from tally {}",
                        election.total_votes
                    )));
                }
                election.finalized = true;
            }

            LedgerEvent::Paused { .. } => self.paused = true,
            LedgerEvent::Unpaused { .. } => self.paused = false,
        }

        Ok(())
    }

    /// Compare every election's counter against its candidates and its
    /// vote records.
    pub fn tally_checks(&self) -> Vec<TallyCheck> {
        let mut record_counts: HashMap<ElectionId, u64> = HashMap::new();
        for (election_id, _) in self.votes.keys() {
            *record_counts.entry(*election_id).or_default() += 1;
        }

        self.elections
            .iter()
            .map(|election| TallyCheck {
                election_id: election.id,
                total_votes: election.total_votes,
                candidate_sum: self
                    .candidates(election.id)
                    .map_or(0, |list| list.iter().map(|c| c.vote_count).sum()),
                record_count: record_counts.get(&election.id).copied().unwrap_or(0),
            })
            .collect()
    }

    fn require_authority(&self, caller: &Address) -> Result<(), LedgerError> {
        if *caller != self.config.authority {
            return Err(LedgerError::Unauthorized { caller: *caller });
        }
        Ok(())
    }

    fn require_unpaused(&self) -> Result<(), LedgerError> {
        if self.paused {
            return Err(LedgerError::SystemPaused);
        }
        Ok(())
    }
}

fn require_text(value: &str, what: &str) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        return Err(LedgerError::InvalidArgument(format!("{what} cannot be empty")));
    }
    Ok(())
}
