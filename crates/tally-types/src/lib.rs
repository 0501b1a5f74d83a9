//! Foundation types for the Tally election ledger.
//!
//! Every other Tally crate depends on `tally-types`.
//!
//! # Key Types
//!
//! - [`Address`]: 20-byte account identity of a caller (authority or voter)
//! - [`ElectionId`] / [`CandidateId`]: dense sequential identifiers starting at 1
//! - [`Timestamp`]: whole seconds since the UNIX epoch

pub mod address;
pub mod error;
pub mod ids;
pub mod time;

pub use address::Address;
pub use error::TypeError;
pub use ids::{CandidateId, ElectionId};
pub use time::{Timestamp, SECONDS_PER_DAY};
