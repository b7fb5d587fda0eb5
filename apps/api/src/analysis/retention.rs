use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::datasets::RosterRow;
use crate::models::SegmentMap;

const RETENTION_WINDOW_DAYS: u64 = 90;

/// Planning assumption the observed 90-day retention is compared against.
pub const RETENTION_BENCHMARK: f64 = 0.78;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionCohort {
    pub role: String,
    pub state: String,
    pub total: u64,
    pub retained_90: u64,
    pub retention_rate: f64,
    /// `retention_rate - RETENTION_BENCHMARK`.
    pub vs_benchmark: f64,
    pub meets_benchmark: bool,
}

/// Still employed, or terminated on/after hire date + 90 days.
pub fn is_retained(hire_date: NaiveDate, termination_date: Option<NaiveDate>) -> bool {
    match termination_date {
        None => true,
        Some(terminated) => hire_date
            .checked_add_days(Days::new(RETENTION_WINDOW_DAYS))
            .is_some_and(|threshold| terminated >= threshold),
    }
}

/// 90-day retention per (role, state) cohort, ordered by segment.
pub fn analyze_retention(roster: &[RosterRow]) -> Vec<RetentionCohort> {
    let mut cohorts: SegmentMap<(u64, u64)> = SegmentMap::new();
    for employee in roster {
        let (total, retained) = cohorts.entry(employee.key.clone()).or_default();
        *total += 1;
        if is_retained(employee.hire_date, employee.termination_date) {
            *retained += 1;
        }
    }

    cohorts
        .into_iter()
        .map(|(key, (total, retained_90))| {
            let retention_rate = retained_90 as f64 / total as f64;
            RetentionCohort {
                role: key.role,
                state: key.state,
                total,
                retained_90,
                retention_rate,
                vs_benchmark: retention_rate - RETENTION_BENCHMARK,
                meets_benchmark: retention_rate >= RETENTION_BENCHMARK,
            }
        })
        .collect()
}
