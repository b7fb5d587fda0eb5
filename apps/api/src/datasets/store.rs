use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::schema::{Dataset, DatasetKind, SchemaError};

/// Outcome of the most recent load attempt for one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatasetStatus {
    Empty,
    Loaded { rows: usize, message: String },
    Error { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotSummary {
    pub kind: DatasetKind,
    pub required: bool,
    #[serde(flatten)]
    pub status: DatasetStatus,
}

#[derive(Debug, Clone)]
struct Slot {
    dataset: Option<Arc<Dataset>>,
    status: DatasetStatus,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            dataset: None,
            status: DatasetStatus::Empty,
        }
    }
}

/// The datasets one analysis run reads. Cheap to clone; holds shared references.
#[derive(Debug, Clone)]
pub struct DatasetSnapshot {
    pub mmm: Arc<Dataset>,
    pub ashby: Arc<Dataset>,
    pub spend: Arc<Dataset>,
    pub headcount: Arc<Dataset>,
    pub roster: Option<Arc<Dataset>>,
}

/// In-memory dataset slots for the session, one per `DatasetKind`.
///
/// Each load writes only its own slot. A failed load empties the slot and keeps
/// the error as its status.
#[derive(Debug, Clone)]
pub struct RecordStore {
    slots: BTreeMap<DatasetKind, Slot>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            slots: DatasetKind::ALL
                .into_iter()
                .map(|kind| (kind, Slot::default()))
                .collect(),
        }
    }

    fn slot_mut(&mut self, kind: DatasetKind) -> &mut Slot {
        self.slots.entry(kind).or_default()
    }

    /// Stores a validated dataset in its slot, replacing any previous one.
    pub fn insert(&mut self, dataset: Dataset) -> DatasetStatus {
        let rows = dataset.len();
        let status = DatasetStatus::Loaded {
            rows,
            message: format!("{rows} rows loaded"),
        };
        let slot = self.slot_mut(dataset.kind());
        slot.dataset = Some(Arc::new(dataset));
        slot.status = status.clone();
        status
    }

    /// Records a failed load: the slot is cleared and the error kept as status.
    pub fn record_failure(&mut self, kind: DatasetKind, error: &SchemaError) -> DatasetStatus {
        let status = DatasetStatus::Error {
            message: format!("Error: {error}"),
        };
        let slot = self.slot_mut(kind);
        slot.dataset = None;
        slot.status = status.clone();
        status
    }

    /// Applies a load outcome to its slot and hands the outcome back.
    pub fn apply(
        &mut self,
        kind: DatasetKind,
        outcome: Result<Dataset, SchemaError>,
    ) -> Result<DatasetStatus, SchemaError> {
        match outcome {
            Ok(dataset) => Ok(self.insert(dataset)),
            Err(e) => {
                self.record_failure(kind, &e);
                Err(e)
            }
        }
    }

    pub fn clear(&mut self, kind: DatasetKind) {
        *self.slot_mut(kind) = Slot::default();
    }

    pub fn get(&self, kind: DatasetKind) -> Option<Arc<Dataset>> {
        self.slots.get(&kind).and_then(|s| s.dataset.clone())
    }

    pub fn status(&self, kind: DatasetKind) -> DatasetStatus {
        self.slots
            .get(&kind)
            .map(|s| s.status.clone())
            .unwrap_or(DatasetStatus::Empty)
    }

    pub fn summaries(&self) -> Vec<SlotSummary> {
        DatasetKind::ALL
            .into_iter()
            .map(|kind| SlotSummary {
                kind,
                required: kind.is_required_for_analysis(),
                status: self.status(kind),
            })
            .collect()
    }

    /// Required kinds whose slot is currently empty.
    pub fn missing_required(&self) -> Vec<DatasetKind> {
        DatasetKind::ALL
            .into_iter()
            .filter(|k| k.is_required_for_analysis() && self.get(*k).is_none())
            .collect()
    }

    pub fn is_ready(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// Shares the loaded datasets for one analysis run, or names the missing ones.
    pub fn snapshot(&self) -> Result<DatasetSnapshot, Vec<DatasetKind>> {
        match (
            self.get(DatasetKind::Mmm),
            self.get(DatasetKind::Ashby),
            self.get(DatasetKind::Spend),
            self.get(DatasetKind::Headcount),
        ) {
            (Some(mmm), Some(ashby), Some(spend), Some(headcount)) => Ok(DatasetSnapshot {
                mmm,
                ashby,
                spend,
                headcount,
                roster: self.get(DatasetKind::Roster),
            }),
            _ => Err(self.missing_required()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::schema::load_dataset;

    fn load(store: &mut RecordStore, kind: DatasetKind, csv: &str) -> Result<DatasetStatus, SchemaError> {
        store.apply(kind, load_dataset(kind, csv))
    }

    fn fill_required(store: &mut RecordStore) {
        load(store, DatasetKind::Mmm, "date,role,state,applications\nd,R,S,10").unwrap();
        load(
            store,
            DatasetKind::Ashby,
            "candidate_id,role,state,applied_at,hired_at,status\nC1,R,S,d,,applied",
        )
        .unwrap();
        load(store, DatasetKind::Spend, "date,role,state,spend\nd,R,S,100").unwrap();
        load(
            store,
            DatasetKind::Headcount,
            "month,role,state,forecast_headcount,hires_signed\nm,R,S,5,1",
        )
        .unwrap();
    }

    #[test]
    fn test_new_store_is_empty_and_not_ready() {
        let store = RecordStore::new();
        assert!(!store.is_ready());
        assert_eq!(store.missing_required().len(), 4);
        assert!(store
            .summaries()
            .iter()
            .all(|s| s.status == DatasetStatus::Empty));
    }

    #[test]
    fn test_loaded_status_message() {
        let mut store = RecordStore::new();
        let status = load(
            &mut store,
            DatasetKind::Spend,
            "date,role,state,spend\nd,R,S,1\nd,R,S,2\nd,R,S,3",
        )
        .unwrap();
        assert_eq!(
            status,
            DatasetStatus::Loaded {
                rows: 3,
                message: "3 rows loaded".to_string()
            }
        );
    }

    #[test]
    fn test_ready_without_roster() {
        let mut store = RecordStore::new();
        fill_required(&mut store);
        assert!(store.is_ready());
        let snapshot = store.snapshot().unwrap();
        assert!(snapshot.roster.is_none());
    }

    #[test]
    fn test_failed_load_clears_slot() {
        let mut store = RecordStore::new();
        fill_required(&mut store);
        assert!(load(&mut store, DatasetKind::Spend, "date,role,state\nd,R,S").is_err());

        assert!(store.get(DatasetKind::Spend).is_none());
        assert!(matches!(
            store.status(DatasetKind::Spend),
            DatasetStatus::Error { .. }
        ));
        assert_eq!(store.snapshot().unwrap_err(), vec![DatasetKind::Spend]);
    }

    #[test]
    fn test_load_does_not_touch_other_slots() {
        let mut store = RecordStore::new();
        fill_required(&mut store);
        let before = store.get(DatasetKind::Mmm).unwrap();
        load(&mut store, DatasetKind::Spend, "date,role,state,spend\nd,R,S,200").unwrap();
        assert!(Arc::ptr_eq(&before, &store.get(DatasetKind::Mmm).unwrap()));
    }

    #[test]
    fn test_clear_resets_status() {
        let mut store = RecordStore::new();
        fill_required(&mut store);
        store.clear(DatasetKind::Mmm);
        assert_eq!(store.status(DatasetKind::Mmm), DatasetStatus::Empty);
        assert!(!store.is_ready());
    }
}
