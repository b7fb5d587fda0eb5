use serde::Serialize;
use tracing::debug;

use crate::analysis::conversion::{planning_rate, Confidence, ConversionEntry};
use crate::analysis::spend_curve::SpendCurve;
use crate::datasets::{HeadcountRow, SpendRow};
use crate::models::SegmentMap;

/// Staff loss per month applied to signed hires.
const MONTHLY_CHURN: f64 = 0.08;
const CHURN_MONTHS: i32 = 3;
/// Spend changes within ±5% are reported as `maintain`.
const CHANGE_BAND_PERCENT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendAction {
    Increase,
    Decrease,
    Maintain,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub role: String,
    pub state: String,
    pub gap: u64,
    pub conversion_rate: f64,
    pub target_applications: u64,
    /// 0 when the segment has no gap or cannot be priced.
    pub recommended_spend: f64,
    /// False when there is a gap but no spend curve with positive efficiency to
    /// price it. The change is then reported as 0 and `maintain`.
    pub priced: bool,
    /// Mean of the segment's spend rows; 0 when it has none.
    pub current_spend: f64,
    /// 0 when `current_spend` is 0 or the segment is unpriced.
    pub change_percent: f64,
    pub recommendation: SpendAction,
    pub confidence: Confidence,
}

/// Signed hires expected to remain after three months of 8% monthly churn.
pub fn churn_adjusted_staff(hires_signed: i64) -> i64 {
    let survival = (1.0 - MONTHLY_CHURN).powi(CHURN_MONTHS);
    (hires_signed as f64 * survival).floor() as i64
}

pub fn hiring_gap(forecast_headcount: i64, hires_signed: i64) -> u64 {
    forecast_headcount
        .saturating_sub(churn_adjusted_staff(hires_signed))
        .max(0) as u64
}

pub fn classify_change(change_percent: f64) -> SpendAction {
    if change_percent > CHANGE_BAND_PERCENT {
        SpendAction::Increase
    } else if change_percent < -CHANGE_BAND_PERCENT {
        SpendAction::Decrease
    } else {
        SpendAction::Maintain
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct SpendTotal {
    sum: f64,
    rows: usize,
}

/// One recommendation per headcount target, in input order.
pub fn generate_recommendations(
    targets: &[HeadcountRow],
    rates: &SegmentMap<ConversionEntry>,
    curves: &SegmentMap<SpendCurve>,
    spend_rows: &[SpendRow],
) -> Vec<Recommendation> {
    let mut spend_by_segment: SegmentMap<SpendTotal> = SegmentMap::new();
    for row in spend_rows {
        let total = spend_by_segment.entry(row.key.clone()).or_default();
        total.sum += row.spend;
        total.rows += 1;
    }

    targets
        .iter()
        .map(|target| {
            let key = &target.key;
            let conversion_rate = planning_rate(rates, key);
            let gap = hiring_gap(target.forecast_headcount, target.hires_signed);

            let target_applications = if gap == 0 {
                0
            } else {
                (gap as f64 / conversion_rate).ceil() as u64
            };

            let usable_curve = curves.get(key).filter(|c| c.is_usable());
            let priced = target_applications == 0 || usable_curve.is_some();
            let recommended_spend = match usable_curve {
                Some(curve) if target_applications > 0 => {
                    target_applications as f64 / curve.efficiency
                }
                _ => 0.0,
            };
            if !priced {
                debug!("{key}: gap of {gap} but no usable spend curve to price it");
            }

            let current_spend = spend_by_segment
                .get(key)
                .filter(|t| t.rows > 0)
                .map(|t| t.sum / t.rows as f64)
                .unwrap_or(0.0);

            let change_percent = if priced && current_spend > 0.0 {
                (recommended_spend - current_spend) / current_spend * 100.0
            } else {
                0.0
            };

            let confidence = rates
                .get(key)
                .map(|e| e.confidence)
                .unwrap_or(Confidence::Low);

            Recommendation {
                role: key.role.clone(),
                state: key.state.clone(),
                gap,
                conversion_rate,
                target_applications,
                recommended_spend,
                priced,
                current_spend,
                change_percent,
                recommendation: classify_change(change_percent),
                confidence,
            }
        })
        .collect()
}
