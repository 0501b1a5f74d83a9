use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use tally_ledger::{
    Command, ElectionPhase, InMemoryLedger, LedgerConfig, LedgerError, LedgerReader, LedgerWriter,
    ManualClock, StreamValidator,
};
use tally_types::{Address, CandidateId, ElectionId, Timestamp, SECONDS_PER_DAY};

const T0: u64 = 1_600_000_000;

fn authority() -> Address {
    Address::from_bytes([0xaa; 20])
}

fn voter(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

#[derive(Clone, Debug)]
enum Step {
    Register(u8),
    Vote { voter: u8, election: u64, candidate: u64 },
    Advance(u64),
    Finalize(u64),
    Pause,
    Unpause,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (1u8..8).prop_map(Step::Register),
        (1u8..8, 1u64..4, 1u64..5).prop_map(|(voter, election, candidate)| Step::Vote {
            voter,
            election,
            candidate
        }),
        (0u64..2 * SECONDS_PER_DAY).prop_map(Step::Advance),
        (1u64..4).prop_map(Step::Finalize),
        Just(Step::Pause),
        Just(Step::Unpause),
    ]
}

/// Two elections of one and two days, three candidates each.
fn ledger() -> (Arc<ManualClock>, InMemoryLedger) {
    let clock = Arc::new(ManualClock::new(Timestamp::from_secs(T0)));
    let ledger = InMemoryLedger::new(LedgerConfig::new(authority()), clock.clone());
    for days in [1, 2] {
        let (id, _) = ledger
            .create_election(&authority(), "E", "", days)
            .unwrap();
        for name in ["A", "B", "C"] {
            ledger.add_candidate(&authority(), id, name).unwrap();
        }
    }
    (clock, ledger)
}

fn run(clock: &ManualClock, ledger: &InMemoryLedger, step: &Step) -> Result<(), LedgerError> {
    match step {
        Step::Register(n) => ledger.register_voter(&voter(*n)).map(drop),
        Step::Vote {
            voter: n,
            election,
            candidate,
        } => ledger
            .vote(
                &voter(*n),
                ElectionId::new(*election).unwrap(),
                CandidateId::new(*candidate).unwrap(),
            )
            .map(drop),
        Step::Advance(secs) => {
            clock.advance(*secs);
            Ok(())
        }
        Step::Finalize(election) => ledger
            .finalize_election(&authority(), ElectionId::new(*election).unwrap())
            .map(drop),
        Step::Pause => ledger.pause(&authority()).map(drop),
        Step::Unpause => ledger.unpause(&authority()).map(drop),
    }
}

proptest! {
    /// totalVotes equals the candidate sum and the record count after any
    /// sequence of operations, and the receipt stream validates.
    #[test]
    fn tallies_stay_consistent(steps in prop::collection::vec(step(), 0..60)) {
        let (clock, ledger) = ledger();
        for s in &steps {
            let _ = run(&clock, &ledger, s);
        }
        for election in ledger.elections().unwrap() {
            let sum: u64 = ledger.results(election.id).unwrap().iter().map(|r| r.vote_count).sum();
            prop_assert_eq!(election.total_votes, sum);
        }
        let report = StreamValidator::validate(&ledger).unwrap();
        prop_assert!(report.is_valid(), "{:?}", report.violations);
    }

    /// No (voter, election) pair is ever counted twice.
    #[test]
    fn at_most_one_vote_per_pair(steps in prop::collection::vec(step(), 0..60)) {
        let (clock, ledger) = ledger();
        let mut accepted = HashSet::new();
        for s in &steps {
            if run(&clock, &ledger, s).is_ok() {
                if let Step::Vote { voter, election, .. } = s {
                    prop_assert!(accepted.insert((*voter, *election)));
                }
            }
        }
    }

    /// A rejected command leaves every observable unchanged.
    #[test]
    fn rejections_have_no_effect(steps in prop::collection::vec(step(), 0..40)) {
        let (clock, ledger) = ledger();
        for s in &steps {
            let before = (ledger.receipt_count().unwrap(), ledger.elections().unwrap(), ledger.is_paused().unwrap());
            if run(&clock, &ledger, s).is_err() {
                let after = (ledger.receipt_count().unwrap(), ledger.elections().unwrap(), ledger.is_paused().unwrap());
                prop_assert_eq!(before, after);
            }
        }
    }

    /// Finalization is one-way: a finalized election stays finalized and
    /// its tally never moves again.
    #[test]
    fn finalize_is_terminal(steps in prop::collection::vec(step(), 0..60)) {
        let (clock, ledger) = ledger();
        let mut frozen: Vec<Option<u64>> = vec![None, None];
        for s in &steps {
            let _ = run(&clock, &ledger, s);
            for (slot, election) in frozen.iter_mut().zip(ledger.elections().unwrap()) {
                if let Some(total) = *slot {
                    prop_assert!(election.finalized);
                    prop_assert_eq!(total, election.total_votes);
                    prop_assert_eq!(ledger.phase(election.id).unwrap(), ElectionPhase::Finalized);
                } else if election.finalized {
                    *slot = Some(election.total_votes);
                }
            }
        }
    }

    /// Candidates are accepted exactly while now < start_time.
    #[test]
    fn candidate_window_boundary(offset in 0u64..5, window in 1u64..10) {
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(T0)));
        let config = LedgerConfig::new(authority()).with_candidate_window(window);
        let ledger = InMemoryLedger::new(config, clock.clone());
        let (id, _) = ledger.create_election(&authority(), "E", "", 1).unwrap();
        let start = ledger.election(id).unwrap().unwrap().start_time;

        clock.set(Timestamp::from_secs(T0 + offset));
        let result = ledger.add_candidate(&authority(), id, "A");
        if Timestamp::from_secs(T0 + offset) < start {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result.unwrap_err(), LedgerError::CandidateWindowClosed(id));
        }
    }

    /// The voting window spans exactly the requested number of days.
    #[test]
    fn duration_is_exact(days in 1u64..10_000) {
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(T0)));
        let ledger = InMemoryLedger::new(LedgerConfig::new(authority()), clock);
        let (id, _) = ledger.create_election(&authority(), "E", "", days).unwrap();
        let election = ledger.election(id).unwrap().unwrap();
        prop_assert_eq!(election.end_time.as_secs() - election.start_time.as_secs(), days * SECONDS_PER_DAY);
    }

    /// Only the authority may submit administrative commands.
    #[test]
    fn admin_commands_need_authority(n in 1u8..0xaa) {
        let (_, ledger) = ledger();
        let caller = voter(n);
        for command in [Command::Pause, Command::Unpause, Command::FinalizeElection { election_id: ElectionId::FIRST }] {
            prop_assert_eq!(
                ledger.submit(&caller, command).unwrap_err(),
                LedgerError::Unauthorized { caller }
            );
        }
    }
}
