use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use thiserror::Error;

use super::csv_reader::read_table;
use crate::models::SegmentKey;

/// Largest magnitude accepted in a count column (applications, headcount, hires).
const MAX_COUNT: i64 = 1_000_000_000;

// ────────────────────────────────────────────────────────────────────────────
// Dataset kinds and their required columns
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    /// Marketing-mix model output: applications per period.
    Mmm,
    /// Applicant-tracking export, one row per candidate.
    Ashby,
    Spend,
    Headcount,
    Roster,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 5] = [
        DatasetKind::Mmm,
        DatasetKind::Ashby,
        DatasetKind::Spend,
        DatasetKind::Headcount,
        DatasetKind::Roster,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DatasetKind::Mmm => "mmm",
            DatasetKind::Ashby => "ashby",
            DatasetKind::Spend => "spend",
            DatasetKind::Headcount => "headcount",
            DatasetKind::Roster => "roster",
        }
    }

    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            DatasetKind::Mmm => &["date", "role", "state", "applications"],
            DatasetKind::Ashby => &[
                "candidate_id",
                "role",
                "state",
                "applied_at",
                "hired_at",
                "status",
            ],
            DatasetKind::Spend => &["date", "role", "state", "spend"],
            DatasetKind::Headcount => &[
                "month",
                "role",
                "state",
                "forecast_headcount",
                "hires_signed",
            ],
            DatasetKind::Roster => &[
                "employee_id",
                "role",
                "state",
                "hire_date",
                "termination_date",
            ],
        }
    }

    /// Roster only unlocks retention analysis; the other four gate the whole run.
    pub fn is_required_for_analysis(self) -> bool {
        !matches!(self, DatasetKind::Roster)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatasetKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown dataset '{s}'"))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("{kind} file is empty or has no data rows")]
    Empty { kind: DatasetKind },

    #[error("{kind} file is missing required column(s): {}", .missing.join(", "))]
    MissingColumns {
        kind: DatasetKind,
        missing: Vec<String>,
    },

    #[error("{kind} row {row}: column '{column}' has invalid value '{value}' (expected {expected})")]
    InvalidValue {
        kind: DatasetKind,
        row: usize,
        column: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{kind} file could not be read: {message}")]
    Malformed { kind: DatasetKind, message: String },
}

// ────────────────────────────────────────────────────────────────────────────
// Untyped records
// ────────────────────────────────────────────────────────────────────────────

/// One CSV row as column name → trimmed string value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TabularRecord {
    fields: HashMap<String, String>,
}

impl TabularRecord {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    /// Value for `column`, or `""` when the column is absent.
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }
}

/// A schema-checked set of records for one dataset slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    kind: DatasetKind,
    records: Vec<TabularRecord>,
}

impl Dataset {
    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Typed view of every record. Fails on the first row that does not convert.
    pub fn rows<R: SchemaRow>(&self) -> Result<Vec<R>, SchemaError> {
        debug_assert_eq!(R::KIND, self.kind);
        self.records
            .iter()
            .enumerate()
            .map(|(i, record)| R::from_record(record, i + 1))
            .collect()
    }

    fn validate_rows(&self) -> Result<(), SchemaError> {
        match self.kind {
            DatasetKind::Mmm => self.rows::<MmmRow>().map(drop),
            DatasetKind::Ashby => self.rows::<AshbyRow>().map(drop),
            DatasetKind::Spend => self.rows::<SpendRow>().map(drop),
            DatasetKind::Headcount => self.rows::<HeadcountRow>().map(drop),
            DatasetKind::Roster => self.rows::<RosterRow>().map(drop),
        }
    }
}

/// Parses CSV text for `kind` and checks it against the dataset's schema.
///
/// Fails when the file has no data rows, lacks a required column, or carries a
/// value that cannot be read as the column's type (numbers, dates).
pub fn load_dataset(kind: DatasetKind, text: &str) -> Result<Dataset, SchemaError> {
    let table = read_table(kind, text)?;
    if table.records.is_empty() {
        return Err(SchemaError::Empty { kind });
    }

    let missing: Vec<String> = kind
        .required_columns()
        .iter()
        .filter(|col| !table.headers.iter().any(|h| h == *col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SchemaError::MissingColumns { kind, missing });
    }

    let dataset = Dataset {
        kind,
        records: table.records,
    };
    dataset.validate_rows()?;
    Ok(dataset)
}

// ────────────────────────────────────────────────────────────────────────────
// Typed rows
// ────────────────────────────────────────────────────────────────────────────

/// A typed view over one record of a specific dataset kind.
pub trait SchemaRow: Sized {
    const KIND: DatasetKind;

    /// `row` is the 1-based data row number, used in error messages.
    fn from_record(record: &TabularRecord, row: usize) -> Result<Self, SchemaError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MmmRow {
    pub key: SegmentKey,
    pub applications: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AshbyRow {
    pub key: SegmentKey,
    pub status: String,
}

impl AshbyRow {
    /// Only an exact `hired` status counts; anything else is a non-hire.
    pub fn is_hired(&self) -> bool {
        self.status == "hired"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpendRow {
    pub key: SegmentKey,
    pub spend: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadcountRow {
    pub key: SegmentKey,
    pub forecast_headcount: i64,
    pub hires_signed: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RosterRow {
    pub key: SegmentKey,
    pub hire_date: NaiveDate,
    pub termination_date: Option<NaiveDate>,
}

impl SchemaRow for MmmRow {
    const KIND: DatasetKind = DatasetKind::Mmm;

    fn from_record(record: &TabularRecord, row: usize) -> Result<Self, SchemaError> {
        let cell = Cell::new(Self::KIND, record, row);
        Ok(Self {
            key: segment_key(record),
            applications: cell.count("applications")?,
        })
    }
}

impl SchemaRow for AshbyRow {
    const KIND: DatasetKind = DatasetKind::Ashby;

    fn from_record(record: &TabularRecord, _row: usize) -> Result<Self, SchemaError> {
        Ok(Self {
            key: segment_key(record),
            status: record.get("status").to_string(),
        })
    }
}

impl SchemaRow for SpendRow {
    const KIND: DatasetKind = DatasetKind::Spend;

    fn from_record(record: &TabularRecord, row: usize) -> Result<Self, SchemaError> {
        let cell = Cell::new(Self::KIND, record, row);
        Ok(Self {
            key: segment_key(record),
            spend: cell.float("spend")?,
        })
    }
}

impl SchemaRow for HeadcountRow {
    const KIND: DatasetKind = DatasetKind::Headcount;

    fn from_record(record: &TabularRecord, row: usize) -> Result<Self, SchemaError> {
        let cell = Cell::new(Self::KIND, record, row);
        Ok(Self {
            key: segment_key(record),
            forecast_headcount: cell.signed_count("forecast_headcount")?,
            hires_signed: cell.signed_count("hires_signed")?,
        })
    }
}

impl SchemaRow for RosterRow {
    const KIND: DatasetKind = DatasetKind::Roster;

    fn from_record(record: &TabularRecord, row: usize) -> Result<Self, SchemaError> {
        let cell = Cell::new(Self::KIND, record, row);
        Ok(Self {
            key: segment_key(record),
            hire_date: cell.date("hire_date")?,
            termination_date: cell.optional_date("termination_date")?,
        })
    }
}

fn segment_key(record: &TabularRecord) -> SegmentKey {
    SegmentKey::new(record.get("role"), record.get("state"))
}

/// Column accessor that turns parse failures into `SchemaError::InvalidValue`.
struct Cell<'a> {
    kind: DatasetKind,
    record: &'a TabularRecord,
    row: usize,
}

impl<'a> Cell<'a> {
    fn new(kind: DatasetKind, record: &'a TabularRecord, row: usize) -> Self {
        Self { kind, record, row }
    }

    fn invalid(&self, column: &'static str, expected: &'static str) -> SchemaError {
        SchemaError::InvalidValue {
            kind: self.kind,
            row: self.row,
            column,
            value: self.record.get(column).to_string(),
            expected,
        }
    }

    fn integer_in(
        &self,
        column: &'static str,
        min: i64,
        expected: &'static str,
    ) -> Result<i64, SchemaError> {
        self.record
            .get(column)
            .parse::<i64>()
            .ok()
            .filter(|v| (min..=MAX_COUNT).contains(v))
            .ok_or_else(|| self.invalid(column, expected))
    }

    fn count(&self, column: &'static str) -> Result<i64, SchemaError> {
        self.integer_in(column, 0, "a whole number from 0 to 1000000000")
    }

    /// Headcount columns may be negative (corrections), within the same bound.
    fn signed_count(&self, column: &'static str) -> Result<i64, SchemaError> {
        self.integer_in(
            column,
            -MAX_COUNT,
            "a whole number from -1000000000 to 1000000000",
        )
    }

    fn float(&self, column: &'static str) -> Result<f64, SchemaError> {
        self.record
            .get(column)
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| self.invalid(column, "a finite number"))
    }

    fn date(&self, column: &'static str) -> Result<NaiveDate, SchemaError> {
        parse_date(self.record.get(column)).ok_or_else(|| self.invalid(column, "a date"))
    }

    fn optional_date(&self, column: &'static str) -> Result<Option<NaiveDate>, SchemaError> {
        if self.record.get(column).is_empty() {
            return Ok(None);
        }
        self.date(column).map(Some)
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (date part kept).
fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}
