// Hiring-funnel analysis: conversion estimation, spend-response fitting,
// gap-driven recommendations, 90-day retention and headline totals.
// Everything here is a pure function of the dataset snapshot; handlers own session state.

pub mod conversion;
pub mod handlers;
pub mod recommendation;
pub mod retention;
pub mod spend_curve;
pub mod summary;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::datasets::{
    AshbyRow, DatasetSnapshot, HeadcountRow, MmmRow, RosterRow, SchemaError, SpendRow,
};
use crate::models::SegmentMap;

pub use conversion::ConversionEntry;
pub use recommendation::Recommendation;
pub use retention::RetentionCohort;
pub use spend_curve::{AverageRatioFitter, SpendCurve, SpendCurveFitter};
pub use summary::Summary;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("dataset could not be read: {0}")]
    Dataset(#[from] SchemaError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub conversion_rates: SegmentMap<ConversionEntry>,
    pub spend_curves: SegmentMap<SpendCurve>,
    pub recommendations: Vec<Recommendation>,
    /// Present only when a roster was loaded.
    pub retention: Option<Vec<RetentionCohort>>,
    pub summary: Summary,
}

/// A completed analysis run as kept in the session.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRun {
    pub run_id: Uuid,
    pub completed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub result: AnalysisResult,
}

impl AnalysisRun {
    pub fn new(result: AnalysisResult) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            completed_at: Utc::now(),
            result,
        }
    }
}

/// Runs the whole pipeline over one snapshot. Either every stage succeeds or
/// nothing is returned.
pub fn run_analysis(
    inputs: &DatasetSnapshot,
    fitter: &dyn SpendCurveFitter,
) -> Result<AnalysisResult, AnalysisError> {
    let mmm = inputs.mmm.rows::<MmmRow>()?;
    let candidates = inputs.ashby.rows::<AshbyRow>()?;
    let spend = inputs.spend.rows::<SpendRow>()?;
    let targets = inputs.headcount.rows::<HeadcountRow>()?;
    let roster = inputs
        .roster
        .as_ref()
        .map(|r| r.rows::<RosterRow>())
        .transpose()?;

    let conversion_rates = conversion::estimate_conversion_rates(&candidates);
    let spend_curves = spend_curve::fit_spend_curves(&spend, &mmm, fitter);
    let recommendations = recommendation::generate_recommendations(
        &targets,
        &conversion_rates,
        &spend_curves,
        &spend,
    );
    let retention = roster.as_deref().map(retention::analyze_retention);
    let summary = summary::summarize(&spend, &mmm, &recommendations);

    Ok(AnalysisResult {
        conversion_rates,
        spend_curves,
        recommendations,
        retention,
        summary,
    })
}
