use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::receipt::Receipt;
use crate::state::LedgerState;

/// Result of replaying a receipt stream into ledger state.
#[derive(Clone, Debug)]
pub struct ReplayResult {
    pub state: LedgerState,
    pub applied_receipts: u64,
    pub applied_events: u64,
    /// Hash of the last replayed receipt; the next receipt links to it.
    pub head_hash: Option<[u8; 32]>,
}

/// Deterministic replay of receipt streams. Never reads a clock.
pub struct ReplayEngine;

impl ReplayEngine {
    /// Rebuild state from genesis, checking sequence, hash links, content
    /// hashes and authority attribution of every receipt before applying it.
    pub fn replay(config: LedgerConfig, receipts: &[Receipt]) -> Result<ReplayResult, LedgerError> {
        let mut state = LedgerState::new(config);
        let mut head_hash = None;
        let mut applied_events = 0u64;

        for (index, receipt) in receipts.iter().enumerate() {
            let expected_seq = index as u64 + 1;
            check_receipt(&state, receipt, expected_seq, head_hash)?;
            for event in &receipt.events {
                state.apply(receipt.seq, event)?;
                applied_events += 1;
            }
            head_hash = Some(receipt.receipt_hash);
        }

        Ok(ReplayResult {
            state,
            applied_receipts: receipts.len() as u64,
            applied_events,
            head_hash,
        })
    }
}

fn check_receipt(
    state: &LedgerState,
    receipt: &Receipt,
    expected_seq: u64,
    prev_hash: Option<[u8; 32]>,
) -> Result<(), LedgerError> {
    let violation = |reason: String| LedgerError::IntegrityViolation {
        seq: receipt.seq,
        reason,
    };

    if receipt.seq != expected_seq {
        return Err(violation(format!("expected seq {expected_seq}")));
    }
    if receipt.prev_hash != prev_hash {
        return Err(violation("broken hash link".into()));
    }
    if receipt.compute_hash()? != receipt.receipt_hash {
        return Err(violation("receipt hash mismatch".into()));
    }
    if receipt.command.requires_authority() && receipt.caller != state.authority() {
        return Err(violation(format!(
            "{} submitted by non-authority {}",
            receipt.command, receipt.caller
        )));
    }
    Ok(())
}
