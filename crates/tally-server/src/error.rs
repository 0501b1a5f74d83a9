use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tally_journal::JournalError;
use tally_ledger::{ErrorKind, LedgerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("missing caller identity header")]
    MissingCaller,

    #[error("invalid caller identity: {0}")]
    InvalidCaller(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// Status code and machine-readable error label for the response.
    pub fn status_and_label(&self) -> (StatusCode, String) {
        match self {
            Self::MissingCaller => (StatusCode::UNAUTHORIZED, "missing_caller".into()),
            Self::InvalidCaller(_) | Self::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, ErrorKind::InvalidArgument.to_string())
            }
            Self::Ledger(e) => (ledger_status(e.kind()), e.kind().to_string()),
            Self::Journal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Storage.to_string()),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal".into())
            }
        }
    }
}

fn ledger_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Unauthorized | ErrorKind::NotRegistered => StatusCode::FORBIDDEN,
        ErrorKind::SystemPaused => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::UnknownEntity => StatusCode::NOT_FOUND,
        ErrorKind::WindowClosed
        | ErrorKind::WindowStillOpen
        | ErrorKind::AlreadyRegistered
        | ErrorKind::AlreadyVoted
        | ErrorKind::AlreadyFinalized => StatusCode::CONFLICT,
        ErrorKind::Integrity | ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, label) = self.status_and_label();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (
            status,
            Json(json!({ "error": label, "message": self.to_string() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use tally_types::{Address, ElectionId};

    use super::*;

    #[test]
    fn ledger_errors_map_to_status() {
        let cases = [
            (LedgerError::Unauthorized { caller: Address::zero() }, StatusCode::FORBIDDEN),
            (LedgerError::SystemPaused, StatusCode::SERVICE_UNAVAILABLE),
            (LedgerError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (LedgerError::UnknownElection(ElectionId::FIRST), StatusCode::NOT_FOUND),
            (LedgerError::VotingClosed(ElectionId::FIRST), StatusCode::CONFLICT),
            (LedgerError::AlreadyFinalized(ElectionId::FIRST), StatusCode::CONFLICT),
            (LedgerError::Storage("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ServerError::from(error).status_and_label().0, status);
        }
    }

    #[test]
    fn missing_caller_is_401() {
        let (status, label) = ServerError::MissingCaller.status_and_label();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(label, "missing_caller");
    }
}
