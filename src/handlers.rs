use crate::analysis_client::AnalysisApi;
use crate::analysis_models::{AnalysisId, AnalysisResult, CreditAnalysis, ProposalId};
use crate::analysis_tracker::{TrackerRegistry, TrackerSnapshot};
use crate::config::Config;
use crate::engine::{PreAnalysisEngine, PreAnalysisReport};
use crate::errors::AppError;
use crate::models::ApplicantFinancials;
use crate::validation;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Stateless pre-analysis evaluator.
    pub engine: PreAnalysisEngine,
    /// One analysis tracker per proposal being watched.
    pub trackers: TrackerRegistry,
    /// Direct access to the analysis API for reads that bypass the tracker cache.
    pub api: Arc<dyn AnalysisApi>,
}

impl AppState {
    pub fn new(config: &Config, api: Arc<dyn AnalysisApi>) -> Self {
        let trackers =
            TrackerRegistry::new(Arc::clone(&api), config.poll_interval(), config.tracker_idle());
        Self {
            engine: PreAnalysisEngine::new(),
            trackers,
            api,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SelectAnalysisRequest {
    pub analysis_id: AnalysisId,
}

#[derive(Debug, Deserialize)]
pub struct OverrideResultRequest {
    pub result: AnalysisResult,
}

/// Routes behind the rate limiter. `/health` is mounted separately.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/pre-analysis", post(pre_analysis))
        .route(
            "/api/v1/proposals/:proposal_id/analyses",
            get(list_analyses).post(submit_analysis),
        )
        .route(
            "/api/v1/proposals/:proposal_id/analyses/:analysis_id",
            get(get_analysis).delete(untrack_analysis),
        )
        .route(
            "/api/v1/proposals/:proposal_id/analyses/:analysis_id/result",
            post(override_result),
        )
        .route(
            "/api/v1/proposals/:proposal_id/selection",
            put(select_analysis),
        )
        .route(
            "/api/v1/proposals/:proposal_id/tracker",
            delete(close_tracker),
        )
}

/// Health check endpoint.
///
/// Returns the service status and version.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-credit-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/pre-analysis
///
/// Validates the applicant's financials and returns the score breakdown,
/// decision and affordability verdict. Nothing is persisted.
pub async fn pre_analysis(
    State(state): State<Arc<AppState>>,
    Json(financials): Json<ApplicantFinancials>,
) -> Result<Json<PreAnalysisReport>, AppError> {
    let kind = validation::validate_financials(&financials)?;
    tracing::info!(
        "POST /pre-analysis - {} applicant, requested {:.2} over {} months",
        kind.as_str(),
        financials.requested_amount,
        financials.term_months
    );

    Ok(Json(state.engine.evaluate(&financials)))
}

/// GET /api/v1/proposals/:proposal_id/analyses
///
/// Opens the proposal's tracker on first access, which loads its history
/// and starts polling anything unfinished.
pub async fn list_analyses(
    State(state): State<Arc<AppState>>,
    Path(proposal_id): Path<ProposalId>,
) -> Result<Json<TrackerSnapshot>, AppError> {
    let tracker = state.trackers.open(proposal_id).await?;
    Ok(Json(tracker.snapshot().await))
}

/// POST /api/v1/proposals/:proposal_id/analyses
///
/// Requests a new third-party analysis. Returns as soon as the server
/// accepted it; the result arrives through polling.
pub async fn submit_analysis(
    State(state): State<Arc<AppState>>,
    Path(proposal_id): Path<ProposalId>,
) -> Result<(StatusCode, Json<CreditAnalysis>), AppError> {
    tracing::info!("POST /proposals/{}/analyses", proposal_id);

    let tracker = state.trackers.open(proposal_id).await?;
    let analysis = tracker.submit().await?;
    Ok((StatusCode::CREATED, Json(analysis)))
}

/// GET /api/v1/proposals/:proposal_id/analyses/:analysis_id
///
/// Fresh read from the server, including restrictions and events.
pub async fn get_analysis(
    State(state): State<Arc<AppState>>,
    Path((proposal_id, analysis_id)): Path<(ProposalId, AnalysisId)>,
) -> Result<Json<CreditAnalysis>, AppError> {
    let analysis = state.api.get_analysis(analysis_id).await?;
    if analysis.proposal.id != proposal_id {
        return Err(AppError::NotFound(format!(
            "analysis {} does not belong to proposal {}",
            analysis_id, proposal_id
        )));
    }
    Ok(Json(analysis))
}

/// DELETE /api/v1/proposals/:proposal_id/analyses/:analysis_id
///
/// Stops tracking one analysis locally. The server record is left alone.
pub async fn untrack_analysis(
    State(state): State<Arc<AppState>>,
    Path((proposal_id, analysis_id)): Path<(ProposalId, AnalysisId)>,
) -> Result<StatusCode, AppError> {
    let tracker = state
        .trackers
        .get(proposal_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("proposal {} is not being tracked", proposal_id)))?;

    if tracker.untrack(analysis_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "analysis {} is not tracked for proposal {}",
            analysis_id, proposal_id
        )))
    }
}

/// POST /api/v1/proposals/:proposal_id/analyses/:analysis_id/result
///
/// Privileged manual override of the bureau result.
pub async fn override_result(
    State(state): State<Arc<AppState>>,
    Path((proposal_id, analysis_id)): Path<(ProposalId, AnalysisId)>,
    Json(body): Json<OverrideResultRequest>,
) -> Result<Json<CreditAnalysis>, AppError> {
    tracing::info!(
        "POST /proposals/{}/analyses/{}/result - {}",
        proposal_id,
        analysis_id,
        body.result.as_str()
    );

    let tracker = state.trackers.open(proposal_id).await?;
    let analysis = tracker.override_result(analysis_id, body.result).await?;
    Ok(Json(analysis))
}

/// PUT /api/v1/proposals/:proposal_id/selection
pub async fn select_analysis(
    State(state): State<Arc<AppState>>,
    Path(proposal_id): Path<ProposalId>,
    Json(body): Json<SelectAnalysisRequest>,
) -> Result<Json<TrackerSnapshot>, AppError> {
    let tracker = state.trackers.open(proposal_id).await?;
    tracker.select(body.analysis_id).await?;
    Ok(Json(tracker.snapshot().await))
}

/// DELETE /api/v1/proposals/:proposal_id/tracker
///
/// Stops watching the proposal. Responses still in flight are dropped.
pub async fn close_tracker(
    State(state): State<Arc<AppState>>,
    Path(proposal_id): Path<ProposalId>,
) -> Result<StatusCode, AppError> {
    if state.trackers.close(proposal_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "proposal {} is not being tracked",
            proposal_id
        )))
    }
}
