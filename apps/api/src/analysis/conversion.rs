use std::collections::HashMap;

use serde::Serialize;

use crate::datasets::AshbyRow;
use crate::models::{SegmentKey, SegmentMap};

/// Rate assumed when a role has no usable hiring history.
pub const DEFAULT_CONVERSION_RATE: f64 = 0.02;

const BLEND_MIN_APPLICATIONS: u64 = 30;
const BLEND_MIN_HIRES: u64 = 5;
const HIGH_MIN_APPLICATIONS: u64 = 100;
const HIGH_MIN_HIRES: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Hire conversion for one (role, state) segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionEntry {
    pub applications: u64,
    pub hires: u64,
    /// hires / applications for this segment alone.
    pub raw_rate: f64,
    /// Rate used downstream; equals `raw_rate` unless `blended`.
    pub rate: f64,
    pub blended: bool,
    pub confidence: Confidence,
}

/// high: ≥100 applications and ≥10 hires; medium: ≥30 and ≥5; low otherwise.
pub fn classify_confidence(applications: u64, hires: u64) -> Confidence {
    if applications >= HIGH_MIN_APPLICATIONS && hires >= HIGH_MIN_HIRES {
        Confidence::High
    } else if applications >= BLEND_MIN_APPLICATIONS && hires >= BLEND_MIN_HIRES {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    applications: u64,
    hires: u64,
}

impl Tally {
    fn record(&mut self, hired: bool) {
        self.applications += 1;
        if hired {
            self.hires += 1;
        }
    }
}

/// Per-segment conversion rates from applicant records.
///
/// Segments with fewer than 30 applications or fewer than 5 hires are averaged
/// with their role-wide rate. A role-wide rate of zero (no applications or no
/// hires anywhere for the role) falls back to `DEFAULT_CONVERSION_RATE`.
pub fn estimate_conversion_rates(candidates: &[AshbyRow]) -> SegmentMap<ConversionEntry> {
    let mut segments: SegmentMap<Tally> = SegmentMap::new();
    let mut roles: HashMap<&str, Tally> = HashMap::new();

    for candidate in candidates {
        let hired = candidate.is_hired();
        segments
            .entry(candidate.key.clone())
            .or_default()
            .record(hired);
        roles
            .entry(candidate.key.role.as_str())
            .or_default()
            .record(hired);
    }

    segments
        .iter()
        .map(|(key, tally)| {
            let role_average = roles
                .get(key.role.as_str())
                .map(role_average_rate)
                .unwrap_or(DEFAULT_CONVERSION_RATE);
            (key.clone(), conversion_entry(*tally, role_average))
        })
        .collect()
}

fn role_average_rate(tally: &Tally) -> f64 {
    if tally.applications == 0 || tally.hires == 0 {
        return DEFAULT_CONVERSION_RATE;
    }
    tally.hires as f64 / tally.applications as f64
}

fn conversion_entry(tally: Tally, role_average: f64) -> ConversionEntry {
    let raw_rate = tally.hires as f64 / tally.applications as f64;
    let blended = tally.applications < BLEND_MIN_APPLICATIONS || tally.hires < BLEND_MIN_HIRES;
    let rate = if blended {
        (raw_rate + role_average) / 2.0
    } else {
        raw_rate
    };

    ConversionEntry {
        applications: tally.applications,
        hires: tally.hires,
        raw_rate,
        rate,
        blended,
        confidence: classify_confidence(tally.applications, tally.hires),
    }
}

/// Rate to plan with for `key`: the estimated rate if present and positive,
/// otherwise `DEFAULT_CONVERSION_RATE`.
pub fn planning_rate(rates: &SegmentMap<ConversionEntry>, key: &SegmentKey) -> f64 {
    rates
        .get(key)
        .map(|e| e.rate)
        .filter(|r| r.is_finite() && *r > 0.0)
        .unwrap_or(DEFAULT_CONVERSION_RATE)
}
