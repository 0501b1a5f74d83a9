use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::receipt::Receipt;
use crate::state::LedgerState;
use crate::traits::LedgerReader;

/// Result of validating a ledger's receipt stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub receipt_count: u64,
    pub election_count: u64,
    pub hash_chain_valid: bool,
    pub sequence_dense: bool,
    pub admin_attributed: bool,
    pub tallies_consistent: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// Receipt the violation was found at; 0 for whole-state checks.
    pub seq: u64,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    SequenceGap,
    HashChainBreak,
    HashMismatch,
    UnauthorizedAdmin,
    ReplayFailure,
    TallyMismatch,
    LiveDrift,
}

/// Stream integrity validator.
pub struct StreamValidator;

impl StreamValidator {
    /// Validate the whole receipt stream of `reader`, replay it into a
    /// fresh state, and compare that state with what `reader` reports.
    pub fn validate<R: LedgerReader + ?Sized>(reader: &R) -> Result<ValidationReport, LedgerError> {
        let authority = reader.authority()?;
        let receipts = reader.receipts(1)?;
        let mut violations = Vec::new();

        check_stream(&receipts, &mut violations);

        let mut state = LedgerState::new(LedgerConfig::new(authority));
        for receipt in &receipts {
            if receipt.command.requires_authority() && receipt.caller != authority {
                violations.push(Violation {
                    seq: receipt.seq,
                    kind: ViolationKind::UnauthorizedAdmin,
                    description: format!(
                        "{} submitted by {}",
                        receipt.command, receipt.caller
                    ),
                });
            }
            for event in &receipt.events {
                if let Err(error) = state.apply(receipt.seq, event) {
                    violations.push(Violation {
                        seq: receipt.seq,
                        kind: ViolationKind::ReplayFailure,
                        description: error.to_string(),
                    });
                }
            }
        }

        for check in state.tally_checks() {
            if !check.is_consistent() {
                violations.push(Violation {
                    seq: 0,
                    kind: ViolationKind::TallyMismatch,
                    description: format!(
                        "election {}: total {} / candidates {} / records {}",
                        check.election_id, check.total_votes, check.candidate_sum, check.record_count
                    ),
                });
            }
        }

        check_live(reader, &state, &mut violations)?;

        let has = |kinds: &[ViolationKind]| violations.iter().any(|v| kinds.contains(&v.kind));
        Ok(ValidationReport {
            receipt_count: receipts.len() as u64,
            election_count: state.elections().len() as u64,
            hash_chain_valid: !has(&[ViolationKind::HashChainBreak, ViolationKind::HashMismatch]),
            sequence_dense: !has(&[ViolationKind::SequenceGap]),
            admin_attributed: !has(&[ViolationKind::UnauthorizedAdmin]),
            tallies_consistent: !has(&[ViolationKind::TallyMismatch, ViolationKind::LiveDrift]),
            violations,
        })
    }
}

fn check_stream(receipts: &[Receipt], violations: &mut Vec<Violation>) {
    for (index, receipt) in receipts.iter().enumerate() {
        let expected_seq = index as u64 + 1;
        if receipt.seq != expected_seq {
            violations.push(Violation {
                seq: receipt.seq,
                kind: ViolationKind::SequenceGap,
                description: format!("expected seq {expected_seq}, got {}", receipt.seq),
            });
        }

        let expected_prev = index
            .checked_sub(1)
            .map(|prev| receipts[prev].receipt_hash);
        if receipt.prev_hash != expected_prev {
            violations.push(Violation {
                seq: receipt.seq,
                kind: ViolationKind::HashChainBreak,
                description: "previous hash link mismatch".into(),
            });
        }

        match receipt.compute_hash() {
            Ok(hash) if hash == receipt.receipt_hash => {}
            Ok(_) => violations.push(Violation {
                seq: receipt.seq,
                kind: ViolationKind::HashMismatch,
                description: "receipt hash does not match computed".into(),
            }),
            Err(error) => violations.push(Violation {
                seq: receipt.seq,
                kind: ViolationKind::HashMismatch,
                description: error.to_string(),
            }),
        }
    }
}

fn check_live<R: LedgerReader + ?Sized>(
    reader: &R,
    replayed: &LedgerState,
    violations: &mut Vec<Violation>,
) -> Result<(), LedgerError> {
    let live_count = reader.election_count()?;
    if live_count != replayed.elections().len() as u64 {
        violations.push(Violation {
            seq: 0,
            kind: ViolationKind::LiveDrift,
            description: format!(
                "ledger reports {live_count} elections, receipts hold {}",
                replayed.elections().len()
            ),
        });
    }
    if reader.is_paused()? != replayed.is_paused() {
        violations.push(Violation {
            seq: 0,
            kind: ViolationKind::LiveDrift,
            description: "pause flag differs from receipts".into(),
        });
    }

    for election in replayed.elections() {
        let live = reader.election(election.id)?;
        if live.as_ref() != Some(election) {
            violations.push(Violation {
                seq: 0,
                kind: ViolationKind::LiveDrift,
                description: format!("election {} differs from receipts", election.id),
            });
            continue;
        }
        let live_results = reader.results(election.id)?;
        if Some(live_results) != replayed.results(election.id) {
            violations.push(Violation {
                seq: 0,
                kind: ViolationKind::LiveDrift,
                description: format!("results of election {} differ from receipts", election.id),
            });
        }
    }
    Ok(())
}
