//! HTTP server for the Tally election ledger.
//!
//! Exposes the submit interface as JSON `POST` endpoints that act as the
//! caller named by the `x-tally-caller` header, and the read interface
//! and projections as `GET` endpoints that need no identity.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use auth::{AuthProvider, FixedCallerAuth, HeaderCallerAuth, CALLER_HEADER};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use router::{build_router, AppState};
pub use server::TallyServer;
