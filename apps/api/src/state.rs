use std::sync::Arc;

use tokio::sync::RwLock;

use crate::analysis::{AnalysisRun, SpendCurveFitter};
use crate::config::Config;
use crate::datasets::{DatasetKind, DatasetSnapshot, RecordStore};

/// Session data: the dataset slots and the latest completed analysis run.
/// Nothing here is persisted.
#[derive(Debug, Default)]
pub struct Session {
    pub datasets: RecordStore,
    /// Replaced wholesale by each successful run; untouched by a failed one.
    pub latest: Option<Arc<AnalysisRun>>,
    runs_started: u64,
    latest_seq: u64,
}

impl Session {
    /// Takes a snapshot for a new run and numbers the run in start order.
    pub fn begin_run(&mut self) -> Result<(u64, DatasetSnapshot), Vec<DatasetKind>> {
        let snapshot = self.datasets.snapshot()?;
        self.runs_started += 1;
        Ok((self.runs_started, snapshot))
    }

    /// Publishes a finished run unless a run started after it was already published.
    /// Returns whether `latest` was replaced.
    pub fn finish_run(&mut self, seq: u64, run: Arc<AnalysisRun>) -> bool {
        if seq <= self.latest_seq {
            return false;
        }
        self.latest_seq = seq;
        self.latest = Some(run);
        true
    }
}

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub session: Arc<RwLock<Session>>,
    /// Pluggable spend-curve fitter. Default: AverageRatioFitter.
    pub curve_fitter: Arc<dyn SpendCurveFitter>,
}

impl AppState {
    pub fn new(config: Config, curve_fitter: Arc<dyn SpendCurveFitter>) -> Self {
        Self {
            config,
            session: Arc::new(RwLock::new(Session::default())),
            curve_fitter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{run_analysis, AverageRatioFitter};
    use crate::datasets::load_dataset;

    fn ready_session() -> Session {
        let mut session = Session::default();
        let inputs = [
            (DatasetKind::Mmm, "date,role,state,applications\nd,R,S,10"),
            (
                DatasetKind::Ashby,
                "candidate_id,role,state,applied_at,hired_at,status\nC1,R,S,d,,hired",
            ),
            (DatasetKind::Spend, "date,role,state,spend\nd,R,S,100"),
            (
                DatasetKind::Headcount,
                "month,role,state,forecast_headcount,hires_signed\nm,R,S,5,1",
            ),
        ];
        for (kind, csv) in inputs {
            session
                .datasets
                .apply(kind, load_dataset(kind, csv))
                .unwrap();
        }
        session
    }

    fn run_for(snapshot: &DatasetSnapshot) -> Arc<AnalysisRun> {
        Arc::new(AnalysisRun::new(
            run_analysis(snapshot, &AverageRatioFitter).unwrap(),
        ))
    }

    #[test]
    fn test_begin_run_requires_datasets() {
        let mut session = Session::default();
        assert_eq!(session.begin_run().unwrap_err().len(), 4);
    }

    #[test]
    fn test_older_run_finishing_last_does_not_replace_newer() {
        let mut session = ready_session();
        let (first_seq, first_snapshot) = session.begin_run().unwrap();
        let (second_seq, second_snapshot) = session.begin_run().unwrap();
        assert!(second_seq > first_seq);

        let second = run_for(&second_snapshot);
        assert!(session.finish_run(second_seq, Arc::clone(&second)));
        assert!(!session.finish_run(first_seq, run_for(&first_snapshot)));

        let latest = session.latest.as_ref().unwrap();
        assert_eq!(latest.run_id, second.run_id);
    }

    #[test]
    fn test_runs_finishing_in_order_each_publish() {
        let mut session = ready_session();
        let (first_seq, snapshot) = session.begin_run().unwrap();
        assert!(session.finish_run(first_seq, run_for(&snapshot)));
        let (second_seq, snapshot) = session.begin_run().unwrap();
        let second = run_for(&snapshot);
        assert!(session.finish_run(second_seq, Arc::clone(&second)));
        assert_eq!(session.latest.as_ref().unwrap().run_id, second.run_id);
    }
}
