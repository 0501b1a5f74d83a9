use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use tally_ledger::{
    AuditIndexProjection, Candidate, CandidateResult, ElectionLedger, ElectionSummary, LedgerError,
    LedgerEvent, LedgerReader, LedgerWriter, ProjectionBuilder, Receipt, Standings, VoterStatus,
};
use tally_types::{Address, CandidateId, ElectionId, Timestamp};

use crate::auth::AuthProvider;
use crate::error::{ServerError, ServerResult};
use crate::router::AppState;

/// JSON rendering of a receipt with hex-encoded hashes.
#[derive(Clone, Debug, Serialize)]
pub struct ReceiptView {
    pub seq: u64,
    pub timestamp: Timestamp,
    pub caller: Address,
    pub command: &'static str,
    pub events: Vec<LedgerEvent>,
    pub prev_hash: Option<String>,
    pub receipt_hash: String,
}

impl From<&Receipt> for ReceiptView {
    fn from(receipt: &Receipt) -> Self {
        Self {
            seq: receipt.seq,
            timestamp: receipt.timestamp,
            caller: receipt.caller,
            command: receipt.command.name(),
            events: receipt.events.clone(),
            prev_hash: receipt.prev_hash.map(hex::encode),
            receipt_hash: receipt.hash_hex(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateElectionRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub duration_days: u64,
}

#[derive(Debug, Deserialize)]
pub struct AddCandidateRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub candidate_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct ReceiptQuery {
    pub from: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub election: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CreatedElection {
    pub election_id: ElectionId,
    pub receipt: ReceiptView,
}

#[derive(Debug, Serialize)]
pub struct CreatedCandidate {
    pub election_id: ElectionId,
    pub candidate_id: CandidateId,
    pub receipt: ReceiptView,
}

type Created<T> = (StatusCode, Json<T>);

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> ServerResult<Json<Value>> {
    let ledger = &state.ledger;
    Ok(Json(json!({
        "name": "tally-server",
        "version": env!("CARGO_PKG_VERSION"),
        "authority": ledger.authority()?,
        "paused": ledger.is_paused()?,
        "elections": ledger.election_count()?,
        "receipts": ledger.receipt_count()?,
    })))
}

pub async fn list_elections(
    State(state): State<AppState>,
) -> ServerResult<Json<Vec<ElectionSummary>>> {
    Ok(Json(ProjectionBuilder::election_summaries(&*state.ledger)?))
}

pub async fn create_election(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateElectionRequest>,
) -> ServerResult<Created<CreatedElection>> {
    let caller = state.auth.authenticate(&headers).await?;
    let (election_id, receipt) = submit_blocking(&state, move |ledger| {
        ledger.create_election(
            &caller,
            &request.name,
            &request.description,
            request.duration_days,
        )
    })
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedElection {
            election_id,
            receipt: ReceiptView::from(&receipt),
        }),
    ))
}

pub async fn get_election(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ServerResult<Json<ElectionSummary>> {
    let id = election_id(id)?;
    Ok(Json(ProjectionBuilder::election_summary(&*state.ledger, id)?))
}

pub async fn add_candidate(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(request): Json<AddCandidateRequest>,
) -> ServerResult<Created<CreatedCandidate>> {
    let election_id = election_id(id)?;
    let caller = state.auth.authenticate(&headers).await?;
    let (candidate_id, receipt) = submit_blocking(&state, move |ledger| {
        ledger.add_candidate(&caller, election_id, &request.name)
    })
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedCandidate {
            election_id,
            candidate_id,
            receipt: ReceiptView::from(&receipt),
        }),
    ))
}

pub async fn get_candidate(
    State(state): State<AppState>,
    Path((id, cid)): Path<(u64, u64)>,
) -> ServerResult<Json<Candidate>> {
    let election_id = election_id(id)?;
    let candidate_id =
        CandidateId::new(cid).map_err(|e| ServerError::BadRequest(e.to_string()))?;
    if state.ledger.election(election_id)?.is_none() {
        return Err(LedgerError::UnknownElection(election_id).into());
    }
    state
        .ledger
        .candidate(election_id, candidate_id)?
        .map(Json)
        .ok_or_else(|| {
            LedgerError::UnknownCandidate {
                election_id,
                candidate_id,
            }
            .into()
        })
}

pub async fn cast_vote(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(request): Json<VoteRequest>,
) -> ServerResult<Json<ReceiptView>> {
    let election_id = election_id(id)?;
    let candidate_id = CandidateId::new(request.candidate_id)
        .map_err(|e| ServerError::BadRequest(e.to_string()))?;
    let caller = state.auth.authenticate(&headers).await?;
    let receipt =
        submit_blocking(&state, move |ledger| ledger.vote(&caller, election_id, candidate_id)).await?;
    Ok(Json(ReceiptView::from(&receipt)))
}

pub async fn finalize_election(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> ServerResult<Json<ReceiptView>> {
    let election_id = election_id(id)?;
    let caller = state.auth.authenticate(&headers).await?;
    let receipt =
        submit_blocking(&state, move |ledger| ledger.finalize_election(&caller, election_id)).await?;
    Ok(Json(ReceiptView::from(&receipt)))
}

pub async fn get_results(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ServerResult<Json<Vec<CandidateResult>>> {
    Ok(Json(state.ledger.results(election_id(id)?)?))
}

pub async fn get_standings(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ServerResult<Json<Standings>> {
    Ok(Json(ProjectionBuilder::standings(&*state.ledger, election_id(id)?)?))
}

pub async fn election_voter(
    State(state): State<AppState>,
    Path((id, address)): Path<(u64, String)>,
) -> ServerResult<Json<VoterStatus>> {
    let id = election_id(id)?;
    let address = parse_address(&address)?;
    Ok(Json(ProjectionBuilder::voter_status(&*state.ledger, &address, Some(id))?))
}

pub async fn register_voter(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServerResult<Created<ReceiptView>> {
    let caller = state.auth.authenticate(&headers).await?;
    let receipt = submit_blocking(&state, move |ledger| ledger.register_voter(&caller)).await?;
    Ok((StatusCode::CREATED, Json(ReceiptView::from(&receipt))))
}

pub async fn get_voter(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ServerResult<Json<VoterStatus>> {
    let address = parse_address(&address)?;
    Ok(Json(ProjectionBuilder::voter_status(&*state.ledger, &address, None)?))
}

pub async fn pause(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServerResult<Json<ReceiptView>> {
    let caller = state.auth.authenticate(&headers).await?;
    let receipt = submit_blocking(&state, move |ledger| ledger.pause(&caller)).await?;
    Ok(Json(ReceiptView::from(&receipt)))
}

pub async fn unpause(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServerResult<Json<ReceiptView>> {
    let caller = state.auth.authenticate(&headers).await?;
    let receipt = submit_blocking(&state, move |ledger| ledger.unpause(&caller)).await?;
    Ok(Json(ReceiptView::from(&receipt)))
}

pub async fn list_receipts(
    State(state): State<AppState>,
    Query(query): Query<ReceiptQuery>,
) -> ServerResult<Json<Vec<ReceiptView>>> {
    let receipts = state.ledger.receipts(query.from.unwrap_or(1))?;
    Ok(Json(receipts.iter().map(ReceiptView::from).collect()))
}

pub async fn audit_index(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> ServerResult<Json<AuditIndexProjection>> {
    let election = query.election.map(election_id).transpose()?;
    Ok(Json(ProjectionBuilder::audit_index(&*state.ledger, election)?))
}

/// Run a write on the blocking pool. Journal appends may `fsync`.
async fn submit_blocking<T, F>(state: &AppState, write: F) -> ServerResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn ElectionLedger) -> Result<T, LedgerError> + Send + 'static,
{
    let ledger = Arc::clone(&state.ledger);
    let outcome = tokio::task::spawn_blocking(move || write(&*ledger))
        .await
        .map_err(|e| ServerError::Internal(format!("ledger task failed: {e}")))?;
    Ok(outcome?)
}

fn election_id(raw: u64) -> ServerResult<ElectionId> {
    ElectionId::new(raw).map_err(|e| ServerError::BadRequest(e.to_string()))
}

fn parse_address(raw: &str) -> ServerResult<Address> {
    raw.parse()
        .map_err(|e: tally_types::TypeError| ServerError::BadRequest(e.to_string()))
}
