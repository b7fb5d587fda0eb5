use serde::Serialize;

use crate::analysis::recommendation::Recommendation;
use crate::datasets::{MmmRow, SpendRow};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_spend: f64,
    pub total_applications: i64,
    /// 0 when there are no applications.
    pub cost_per_application: f64,
    pub hiring_gap: u64,
}

/// Headline totals for a run. `hiring_gap` sums the gaps of the given recommendations.
pub fn summarize(
    spend_rows: &[SpendRow],
    mmm_rows: &[MmmRow],
    recommendations: &[Recommendation],
) -> Summary {
    let total_spend: f64 = spend_rows.iter().map(|r| r.spend).sum();
    let total_applications = mmm_rows
        .iter()
        .fold(0i64, |acc, r| acc.saturating_add(r.applications));
    let cost_per_application = if total_applications > 0 {
        total_spend / total_applications as f64
    } else {
        0.0
    };

    Summary {
        total_spend,
        total_applications,
        cost_per_application,
        hiring_gap: recommendations
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.gap)),
    }
}
