use async_trait::async_trait;
use axum::http::HeaderMap;
use tally_types::Address;

use crate::error::{ServerError, ServerResult};

/// Header carrying the caller's account address.
pub const CALLER_HEADER: &str = "x-tally-caller";

/// Resolves the account a mutating request acts as.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> ServerResult<Address>;
}

/// Trusts the address in [`CALLER_HEADER`] as-is. Suitable behind a
/// gateway that has already authenticated the account.
pub struct HeaderCallerAuth;

#[async_trait]
impl AuthProvider for HeaderCallerAuth {
    async fn authenticate(&self, headers: &HeaderMap) -> ServerResult<Address> {
        let value = headers.get(CALLER_HEADER).ok_or(ServerError::MissingCaller)?;
        let text = value
            .to_str()
            .map_err(|_| ServerError::InvalidCaller("header is not ASCII".into()))?;
        text.parse()
            .map_err(|e: tally_types::TypeError| ServerError::InvalidCaller(e.to_string()))
    }
}

/// Acts as one fixed account regardless of headers.
pub struct FixedCallerAuth(pub Address);

#[async_trait]
impl AuthProvider for FixedCallerAuth {
    async fn authenticate(&self, _headers: &HeaderMap) -> ServerResult<Address> {
        Ok(self.0)
    }
}
