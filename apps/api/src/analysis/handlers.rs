//! Axum route handlers for the Analysis API.

use std::sync::Arc;

use axum::{extract::State, Json};
use tracing::{info, warn};

use crate::analysis::{run_analysis, AnalysisRun, Recommendation, RetentionCohort, SpendCurve};
use crate::errors::AppError;
use crate::models::SegmentMap;
use crate::state::AppState;

async fn latest_run(state: &AppState) -> Result<Arc<AnalysisRun>, AppError> {
    state
        .session
        .read()
        .await
        .latest
        .clone()
        .ok_or_else(|| AppError::NotFound("No analysis has been run yet".to_string()))
}

/// POST /api/v1/analysis
///
/// Runs the full pipeline on the currently loaded datasets. A successful run
/// replaces the previous one; a failed run leaves it in place. When runs
/// overlap, the one started last is kept as the latest.
pub async fn handle_run_analysis(
    State(state): State<AppState>,
) -> Result<Json<AnalysisRun>, AppError> {
    let (seq, snapshot) = state
        .session
        .write()
        .await
        .begin_run()
        .map_err(|missing| {
            let names: Vec<&str> = missing.iter().map(|k| k.as_str()).collect();
            AppError::NotReady(format!(
                "missing required dataset(s): {}",
                names.join(", ")
            ))
        })?;

    info!(
        "Starting analysis (ashby={} spend={} headcount={} roster={})",
        snapshot.ashby.len(),
        snapshot.spend.len(),
        snapshot.headcount.len(),
        snapshot.roster.as_ref().map_or(0, |r| r.len()),
    );

    // CPU-bound; keep it off the async workers.
    let fitter = Arc::clone(&state.curve_fitter);
    let result = tokio::task::spawn_blocking(move || run_analysis(&snapshot, fitter.as_ref()))
        .await
        .map_err(|e| AppError::Internal(e.into()))??;

    if result.spend_curves.is_empty() {
        warn!("No spend curves could be fitted; recommended spend will be 0 for every target");
    }

    let run = Arc::new(AnalysisRun::new(result));
    if !state.session.write().await.finish_run(seq, Arc::clone(&run)) {
        warn!("Analysis {} superseded by a later run; not kept as latest", run.run_id);
    }

    info!(
        "Analysis {} complete: {} recommendations, {} curves, hiring gap {}",
        run.run_id,
        run.result.recommendations.len(),
        run.result.spend_curves.len(),
        run.result.summary.hiring_gap,
    );

    Ok(Json(run.as_ref().clone()))
}

/// GET /api/v1/analysis
pub async fn handle_get_analysis(
    State(state): State<AppState>,
) -> Result<Json<AnalysisRun>, AppError> {
    let run = latest_run(&state).await?;
    Ok(Json(run.as_ref().clone()))
}

/// GET /api/v1/analysis/recommendations
pub async fn handle_get_recommendations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Recommendation>>, AppError> {
    let run = latest_run(&state).await?;
    Ok(Json(run.result.recommendations.clone()))
}

/// GET /api/v1/analysis/curves
pub async fn handle_get_curves(
    State(state): State<AppState>,
) -> Result<Json<SegmentMap<SpendCurve>>, AppError> {
    let run = latest_run(&state).await?;
    Ok(Json(run.result.spend_curves.clone()))
}

/// GET /api/v1/analysis/retention
///
/// 404 when the latest run had no roster to analyse.
pub async fn handle_get_retention(
    State(state): State<AppState>,
) -> Result<Json<Vec<RetentionCohort>>, AppError> {
    let run = latest_run(&state).await?;
    run.result
        .retention
        .clone()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Latest analysis had no roster".to_string()))
}
