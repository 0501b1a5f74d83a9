use std::sync::Arc;

use tally_journal::JournaledLedger;
use tally_ledger::{ElectionLedger, SystemClock};
use tokio::net::TcpListener;

use crate::auth::{AuthProvider, HeaderCallerAuth};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::{build_router, AppState};

/// Tally ledger server.
pub struct TallyServer {
    config: ServerConfig,
    state: AppState,
}

impl TallyServer {
    /// Open the configured journal and serve it with header-based callers.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let ledger = JournaledLedger::open(
            &config.journal_path,
            config.journal_config(),
            config.ledger.clone(),
            Arc::new(SystemClock),
        )?;
        Ok(Self::with_ledger(config, Arc::new(ledger), Arc::new(HeaderCallerAuth)))
    }

    pub fn with_ledger(
        config: ServerConfig,
        ledger: Arc<dyn ElectionLedger>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        Self {
            config,
            state: AppState::new(ledger, auth),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = build_router(self.state);
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        if !self.config.is_loopback_only() {
            tracing::warn!(
                addr = %self.config.bind_addr,
                header = crate::auth::CALLER_HEADER,
                "caller identity is taken from a request header; expose only behind an authenticating gateway"
            );
        }
        tracing::info!(
            addr = %self.config.bind_addr,
            authority = %self.config.ledger.authority,
            "tally server listening"
        );
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use tally_ledger::{LedgerReader, LedgerWriter};
    use tally_types::Address;

    use super::*;

    #[test]
    fn open_creates_journal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::new(Address::from_bytes([1; 20]));
        config.journal_path = dir.path().join("server.wal");

        let server = TallyServer::open(config.clone()).unwrap();
        assert!(config.journal_path.exists());
        assert_eq!(server.config().bind_addr, config.bind_addr);
        let _router = server.router();
    }

    #[test]
    fn reopen_sees_previous_receipts() {
        let dir = tempfile::tempdir().unwrap();
        let authority = Address::from_bytes([1; 20]);
        let mut config = ServerConfig::new(authority);
        config.journal_path = dir.path().join("server.wal");

        {
            let server = TallyServer::open(config.clone()).unwrap();
            server.state.ledger.pause(&authority).unwrap();
        }
        let server = TallyServer::open(config).unwrap();
        assert!(server.state.ledger.is_paused().unwrap());
    }
}
