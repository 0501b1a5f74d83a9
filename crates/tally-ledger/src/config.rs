use serde::{Deserialize, Serialize};
use tally_types::Address;

/// Seconds between election creation and the opening of the voting window.
pub const DEFAULT_CANDIDATE_WINDOW_SECS: u64 = 1;

/// Static configuration of a ledger instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// The single account allowed to create elections, add candidates,
    /// finalize elections, and toggle the pause flag.
    pub authority: Address,
    /// Width of the candidate registration window. An election created at
    /// `t` opens for voting at `t + candidate_window_secs`; candidates may
    /// be added while `now < start_time`.
    #[serde(default = "default_candidate_window_secs")]
    pub candidate_window_secs: u64,
}

impl LedgerConfig {
    pub fn new(authority: Address) -> Self {
        Self {
            authority,
            candidate_window_secs: DEFAULT_CANDIDATE_WINDOW_SECS,
        }
    }

    pub fn with_candidate_window(mut self, secs: u64) -> Self {
        self.candidate_window_secs = secs;
        self
    }
}

fn default_candidate_window_secs() -> u64 {
    DEFAULT_CANDIDATE_WINDOW_SECS
}
