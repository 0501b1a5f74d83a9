use serde::Serialize;
use tally_types::{Address, CandidateId, ElectionId, Timestamp};

use crate::error::LedgerError;
use crate::event::EventKind;
use crate::records::{Election, ElectionPhase, ElectionSnapshot, VoteRecord};
use crate::traits::LedgerReader;

/// An election with its phase and candidate count at read time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ElectionSummary {
    #[serde(flatten)]
    pub election: Election,
    pub phase: ElectionPhase,
    pub candidate_count: u64,
}

impl From<ElectionSnapshot> for ElectionSummary {
    fn from(snapshot: ElectionSnapshot) -> Self {
        Self {
            candidate_count: snapshot.results.len() as u64,
            phase: snapshot.phase,
            election: snapshot.election,
        }
    }
}

/// One ranked row of [`Standings`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StandingRow {
    /// Competition rank: tied candidates share a rank and the next rank
    /// skips accordingly.
    pub rank: u32,
    pub candidate_id: CandidateId,
    pub name: String,
    pub vote_count: u64,
    /// Share of all votes in basis points (1/100 of a percent), rounded down.
    pub share_bp: u32,
}

/// Results ranked by votes descending, ties broken by ascending candidate id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Standings {
    pub election_id: ElectionId,
    pub phase: ElectionPhase,
    pub total_votes: u64,
    pub rows: Vec<StandingRow>,
    /// Candidates holding the highest count. Empty while no vote is cast.
    pub leaders: Vec<CandidateId>,
}

impl Standings {
    /// The single winner, if the election is finalized without a tie at the top.
    pub fn winner(&self) -> Option<CandidateId> {
        match (self.phase, self.leaders.as_slice()) {
            (ElectionPhase::Finalized, [only]) => Some(*only),
            _ => None,
        }
    }
}

/// Registration and ballot state of one address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VoterStatus {
    pub address: Address,
    pub registered: bool,
    pub registered_at: Option<Timestamp>,
    pub election_id: Option<ElectionId>,
    pub vote: Option<VoteRecord>,
}

/// Row in the audit index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuditIndexEntry {
    pub seq: u64,
    pub receipt_hash: String,
    pub timestamp: Timestamp,
    pub caller: Address,
    pub command: &'static str,
    pub events: Vec<EventKind>,
    pub summary: String,
}

/// Ordered receipt summaries, optionally narrowed to one election.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuditIndexProjection {
    pub election_id: Option<ElectionId>,
    pub entries: Vec<AuditIndexEntry>,
}

/// Deterministic projection builders.
pub struct ProjectionBuilder;

impl ProjectionBuilder {
    pub fn election_summary<R: LedgerReader + ?Sized>(
        reader: &R,
        election_id: ElectionId,
    ) -> Result<ElectionSummary, LedgerError> {
        let snapshot = reader
            .election_snapshot(election_id)?
            .ok_or(LedgerError::UnknownElection(election_id))?;
        Ok(ElectionSummary::from(snapshot))
    }

    pub fn election_summaries<R: LedgerReader + ?Sized>(
        reader: &R,
    ) -> Result<Vec<ElectionSummary>, LedgerError> {
        reader
            .elections()?
            .into_iter()
            .filter_map(|election| reader.election_snapshot(election.id).transpose())
            .map(|snapshot| snapshot.map(ElectionSummary::from))
            .collect()
    }

    pub fn standings<R: LedgerReader + ?Sized>(
        reader: &R,
        election_id: ElectionId,
    ) -> Result<Standings, LedgerError> {
        let ElectionSnapshot {
            phase, mut results, ..
        } = reader
            .election_snapshot(election_id)?
            .ok_or(LedgerError::UnknownElection(election_id))?;
        results.sort_by(|a, b| {
            b.vote_count
                .cmp(&a.vote_count)
                .then(a.candidate_id.cmp(&b.candidate_id))
        });

        // Shares are taken over the rows themselves so they always sum to
        // at most 100%.
        let total: u64 = results.iter().map(|r| r.vote_count).sum();
        let top = results.first().map_or(0, |r| r.vote_count);
        let leaders = if top == 0 {
            Vec::new()
        } else {
            results
                .iter()
                .take_while(|r| r.vote_count == top)
                .map(|r| r.candidate_id)
                .collect()
        };

        let mut rows = Vec::with_capacity(results.len());
        let mut rank = 0u32;
        let mut previous = None;
        for (position, result) in results.into_iter().enumerate() {
            if previous != Some(result.vote_count) {
                rank = position as u32 + 1;
                previous = Some(result.vote_count);
            }
            rows.push(StandingRow {
                rank,
                candidate_id: result.candidate_id,
                name: result.name,
                vote_count: result.vote_count,
                share_bp: share_bp(result.vote_count, total),
            });
        }

        Ok(Standings {
            election_id,
            phase,
            total_votes: total,
            rows,
            leaders,
        })
    }

    /// Registration of `address`, plus its ballot in `election_id` if given.
    pub fn voter_status<R: LedgerReader + ?Sized>(
        reader: &R,
        address: &Address,
        election_id: Option<ElectionId>,
    ) -> Result<VoterStatus, LedgerError> {
        let voter = reader.voter(address)?;
        let vote = match election_id {
            Some(id) => {
                if reader.election(id)?.is_none() {
                    return Err(LedgerError::UnknownElection(id));
                }
                reader.vote_record(id, address)?
            }
            None => None,
        };
        Ok(VoterStatus {
            address: *address,
            registered: voter.is_some_and(|v| v.registered),
            registered_at: voter.map(|v| v.registered_at),
            election_id,
            vote,
        })
    }

    pub fn audit_index<R: LedgerReader + ?Sized>(
        reader: &R,
        election_id: Option<ElectionId>,
    ) -> Result<AuditIndexProjection, LedgerError> {
        let entries = reader
            .receipts(1)?
            .into_iter()
            .filter(|receipt| election_id.map_or(true, |id| receipt.touches_election(id)))
            .map(|receipt| AuditIndexEntry {
                seq: receipt.seq,
                receipt_hash: receipt.hash_hex(),
                timestamp: receipt.timestamp,
                caller: receipt.caller,
                command: receipt.command.name(),
                events: receipt.events.iter().map(|e| e.kind()).collect(),
                summary: receipt
                    .events
                    .iter()
                    .map(|e| e.summary())
                    .collect::<Vec<_>>()
                    .join("; "),
            })
            .collect();

        Ok(AuditIndexProjection {
            election_id,
            entries,
        })
    }
}

fn share_bp(votes: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    (u128::from(votes) * 10_000 / u128::from(total)) as u32
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::LedgerConfig;
    use crate::memory::InMemoryLedger;
    use crate::traits::LedgerWriter;

    fn authority() -> Address {
        Address::from_bytes([0xaa; 20])
    }

    fn voter(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn cid(n: u64) -> CandidateId {
        CandidateId::new(n).unwrap()
    }

    /// Three candidates; votes: Alice 1, Bob 2, Carol 2.
    fn setup() -> (Arc<ManualClock>, InMemoryLedger, ElectionId) {
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(10_000)));
        let ledger = InMemoryLedger::new(LedgerConfig::new(authority()), clock.clone());
        let (id, _) = ledger.create_election(&authority(), "E1", "desc", 1).unwrap();
        for name in ["Alice", "Bob", "Carol"] {
            ledger.add_candidate(&authority(), id, name).unwrap();
        }
        clock.advance(1);
        for (n, candidate) in [(1, 1), (2, 2), (3, 2), (4, 3), (5, 3)] {
            ledger.register_voter(&voter(n)).unwrap();
            ledger.vote(&voter(n), id, cid(candidate)).unwrap();
        }
        (clock, ledger, id)
    }

    #[test]
    fn standings_rank_with_ties() {
        let (_, ledger, id) = setup();
        let standings = ProjectionBuilder::standings(&ledger, id).unwrap();
        let order: Vec<_> = standings.rows.iter().map(|r| (r.rank, r.candidate_id.get())).collect();
        assert_eq!(order, vec![(1, 2), (1, 3), (3, 1)]);
        assert_eq!(standings.leaders, vec![cid(2), cid(3)]);
        assert_eq!(standings.rows[0].share_bp, 4_000);
        assert_eq!(standings.rows[2].share_bp, 2_000);
        assert_eq!(standings.winner(), None);
    }

    #[test]
    fn standings_agree_with_rows_under_concurrent_votes() {
        let (_, ledger, id) = setup();
        let voters: Vec<Address> = (0..200u16)
            .map(|n| {
                let mut bytes = [0x10; 20];
                bytes[..2].copy_from_slice(&n.to_be_bytes());
                Address::from_bytes(bytes)
            })
            .collect();
        for v in &voters {
            ledger.register_voter(v).unwrap();
        }

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for (n, v) in voters.iter().enumerate() {
                    ledger.vote(v, id, cid(n as u64 % 3 + 1)).unwrap();
                }
            });
            for _ in 0..200 {
                let standings = ProjectionBuilder::standings(&ledger, id).unwrap();
                let sum: u64 = standings.rows.iter().map(|r| r.vote_count).sum();
                assert_eq!(sum, standings.total_votes);
                assert!(standings.rows.iter().all(|r| r.share_bp <= 10_000));

                let summary = ProjectionBuilder::election_summary(&ledger, id).unwrap();
                assert_eq!(summary.candidate_count, 3);
            }
        });

        let standings = ProjectionBuilder::standings(&ledger, id).unwrap();
        assert_eq!(standings.total_votes, 205);
    }

    #[test]
    fn standings_without_votes_have_no_leaders() {
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(10)));
        let ledger = InMemoryLedger::new(LedgerConfig::new(authority()), clock);
        let (id, _) = ledger.create_election(&authority(), "E", "", 1).unwrap();
        ledger.add_candidate(&authority(), id, "Alice").unwrap();
        let standings = ProjectionBuilder::standings(&ledger, id).unwrap();
        assert!(standings.leaders.is_empty());
        assert_eq!(standings.rows[0].share_bp, 0);
        assert_eq!(standings.rows[0].rank, 1);
    }

    #[test]
    fn winner_after_finalize() {
        let (clock, ledger, id) = setup();
        ledger.register_voter(&voter(6)).unwrap();
        ledger.vote(&voter(6), id, cid(3)).unwrap();
        clock.advance(2 * tally_types::SECONDS_PER_DAY);
        ledger.finalize_election(&authority(), id).unwrap();
        let standings = ProjectionBuilder::standings(&ledger, id).unwrap();
        assert_eq!(standings.winner(), Some(cid(3)));
    }

    #[test]
    fn summaries_report_phase() {
        let (_, ledger, id) = setup();
        let summary = ProjectionBuilder::election_summary(&ledger, id).unwrap();
        assert_eq!(summary.phase, ElectionPhase::Voting);
        assert_eq!(summary.candidate_count, 3);
        assert_eq!(ProjectionBuilder::election_summaries(&ledger).unwrap().len(), 1);
        assert_eq!(
            ProjectionBuilder::election_summary(&ledger, ElectionId::new(2).unwrap()).unwrap_err(),
            LedgerError::UnknownElection(ElectionId::new(2).unwrap())
        );
    }

    #[test]
    fn voter_status_reports_ballot() {
        let (_, ledger, id) = setup();
        let status = ProjectionBuilder::voter_status(&ledger, &voter(2), Some(id)).unwrap();
        assert!(status.registered);
        assert_eq!(status.vote.map(|v| v.candidate_id), Some(cid(2)));

        let stranger = ProjectionBuilder::voter_status(&ledger, &voter(9), None).unwrap();
        assert!(!stranger.registered);
        assert!(stranger.registered_at.is_none());
        assert!(stranger.vote.is_none());
    }

    #[test]
    fn audit_index_filters_by_election() {
        let (_, ledger, id) = setup();
        let all = ProjectionBuilder::audit_index(&ledger, None).unwrap();
        assert_eq!(all.entries.len(), 14);
        assert_eq!(all.entries[0].command, "create_election");

        let scoped = ProjectionBuilder::audit_index(&ledger, Some(id)).unwrap();
        // Registrations carry no election.
        assert_eq!(scoped.entries.len(), 9);
        assert!(scoped
            .entries
            .iter()
            .all(|e| !e.events.contains(&EventKind::VoterRegistered)));
    }
}
