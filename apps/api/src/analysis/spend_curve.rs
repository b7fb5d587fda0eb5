//! Spend-response curves: how many applications a segment gets per unit of spend.
//!
//! Fitting sits behind `SpendCurveFitter` so a real regression can replace the
//! default heuristic without touching the recommendation engine or handlers.
//! `AppState` carries an `Arc<dyn SpendCurveFitter>`.

use serde::Serialize;

use crate::datasets::{MmmRow, SpendRow};
use crate::models::SegmentMap;

/// Fit quality reported by `AverageRatioFitter`. Not derived from residuals.
pub const PLACEHOLDER_FIT_QUALITY: f64 = 0.75;

/// Ceiling headroom over the best observed application count.
const MAX_APPLICATIONS_HEADROOM: f64 = 1.2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendCurve {
    /// Applications per unit of spend.
    pub efficiency: f64,
    pub max_applications: f64,
    pub half_saturation_spend: f64,
    pub fit_quality: f64,
    /// Which fitter produced the curve.
    pub model: &'static str,
}

impl SpendCurve {
    /// A curve can price applications only when its efficiency is positive.
    pub fn is_usable(&self) -> bool {
        self.efficiency.is_finite() && self.efficiency > 0.0
    }
}

pub trait SpendCurveFitter: Send + Sync {
    /// Returns `None` when the observations cannot support a curve.
    fn fit(&self, spend: &[f64], applications: &[i64]) -> Option<SpendCurve>;
}

// ────────────────────────────────────────────────────────────────────────────
// AverageRatioFitter (default)
// ────────────────────────────────────────────────────────────────────────────

/// Saturation curve from averages alone:
/// efficiency = mean(applications) / mean(spend),
/// ceiling = max(applications) × 1.2, half-saturation = mean(spend).
pub struct AverageRatioFitter;

impl SpendCurveFitter for AverageRatioFitter {
    fn fit(&self, spend: &[f64], applications: &[i64]) -> Option<SpendCurve> {
        let max_apps = applications.iter().copied().max()?;
        let avg_spend = mean(spend)?;
        if avg_spend <= 0.0 {
            return None;
        }
        let avg_apps =
            applications.iter().map(|&n| n as f64).sum::<f64>() / applications.len() as f64;

        Some(SpendCurve {
            efficiency: avg_apps / avg_spend,
            max_applications: max_apps as f64 * MAX_APPLICATIONS_HEADROOM,
            half_saturation_spend: avg_spend,
            fit_quality: PLACEHOLDER_FIT_QUALITY,
            model: "average_ratio",
        })
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[derive(Debug, Default)]
struct Observations {
    spend: Vec<f64>,
    applications: Vec<i64>,
}

/// Fits one curve per segment present in the spend data.
///
/// Application counts are only collected for segments that also have spend.
/// Segments with no spend or no applications produce no curve.
pub fn fit_spend_curves(
    spend_rows: &[SpendRow],
    mmm_rows: &[MmmRow],
    fitter: &dyn SpendCurveFitter,
) -> SegmentMap<SpendCurve> {
    let mut groups: SegmentMap<Observations> = SegmentMap::new();
    for row in spend_rows {
        groups.entry(row.key.clone()).or_default().spend.push(row.spend);
    }
    for row in mmm_rows {
        if let Some(group) = groups.get_mut(&row.key) {
            group.applications.push(row.applications);
        }
    }

    groups
        .into_iter()
        .filter(|(_, obs)| !obs.spend.is_empty() && !obs.applications.is_empty())
        .filter_map(|(key, obs)| {
            fitter
                .fit(&obs.spend, &obs.applications)
                .map(|curve| (key, curve))
        })
        .collect()
}
