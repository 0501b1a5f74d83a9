use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tally_ledger::ElectionLedger;
use tower_http::trace::TraceLayer;

use crate::auth::AuthProvider;
use crate::handler;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn ElectionLedger>,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(ledger: Arc<dyn ElectionLedger>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { ledger, auth }
    }
}

/// Build the axum router with all Tally endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route(
            "/v1/elections",
            get(handler::list_elections).post(handler::create_election),
        )
        .route("/v1/elections/:id", get(handler::get_election))
        .route("/v1/elections/:id/candidates", post(handler::add_candidate))
        .route("/v1/elections/:id/candidates/:cid", get(handler::get_candidate))
        .route("/v1/elections/:id/votes", post(handler::cast_vote))
        .route("/v1/elections/:id/finalize", post(handler::finalize_election))
        .route("/v1/elections/:id/results", get(handler::get_results))
        .route("/v1/elections/:id/standings", get(handler::get_standings))
        .route("/v1/elections/:id/voters/:address", get(handler::election_voter))
        .route("/v1/voters", post(handler::register_voter))
        .route("/v1/voters/:address", get(handler::get_voter))
        .route("/v1/pause", post(handler::pause))
        .route("/v1/unpause", post(handler::unpause))
        .route("/v1/receipts", get(handler::list_receipts))
        .route("/v1/audit", get(handler::audit_index))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
