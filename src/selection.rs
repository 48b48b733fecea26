// Copyright (c) 2025 the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::archive::RunMeta;
use crate::loader::DataSet;
use crate::metrics::{MetricMode, MetricsEngine, SeriesSet};
use indexmap::IndexSet;
use tracing::debug;

/// Collapses any number of requests into at most one pending job, run the
/// next time the owner gets around to it (e.g. when its event loop idles).
#[derive(Debug, Default)]
pub struct RecomputeScheduler {
    scheduled: bool,
}

impl RecomputeScheduler {
    /// Returns `false` if a job was already pending.
    pub fn schedule(&mut self) -> bool {
        if self.scheduled {
            return false;
        }
        self.scheduled = true;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.scheduled
    }

    pub fn run_pending<T>(&mut self, job: impl FnOnce() -> T) -> Option<T> {
        if !self.scheduled {
            return None;
        }
        let out = job();
        self.scheduled = false;
        Some(out)
    }
}

/// What the user currently wants to see. Owned by the presentation layer
/// and handed to the metrics engine when it asks for fresh series.
#[derive(Debug, Default)]
pub struct SelectionState {
    runs: Vec<RunMeta>,
    cases: IndexSet<String>,
    mode: MetricMode,
    refresher: RecomputeScheduler,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything in `data` selected, which is how a freshly loaded data
    /// set is shown.
    pub fn all_of(data: &DataSet) -> Self {
        let mut selection = Self::new();
        selection.select_all(data);
        selection
    }

    pub fn selected_runs(&self) -> &[RunMeta] {
        &self.runs
    }

    pub fn selected_cases(&self) -> &IndexSet<String> {
        &self.cases
    }

    pub fn mode(&self) -> MetricMode {
        self.mode
    }

    pub fn select_all(&mut self, data: &DataSet) {
        self.runs = data.run_metas().cloned().collect();
        self.cases = data.known_cases.clone();
        self.on_selection_changed();
    }

    pub fn set_runs(&mut self, runs: impl IntoIterator<Item = RunMeta>) {
        self.runs = runs.into_iter().collect();
        self.on_selection_changed();
    }

    pub fn set_cases(&mut self, cases: impl IntoIterator<Item = String>) {
        self.cases = cases.into_iter().collect();
        self.on_selection_changed();
    }

    /// Narrows the case selection down to a single case, as when the user
    /// clicks on one line of the plot.
    pub fn focus_case(&mut self, case: &str) {
        self.cases.clear();
        self.cases.insert(case.to_string());
        self.on_selection_changed();
    }

    pub fn set_mode(&mut self, mode: MetricMode) {
        self.mode = mode;
        self.on_selection_changed();
    }

    /// Requests a recomputation. Returns `false` if one was already pending,
    /// in which case this change will be picked up by it.
    pub fn on_selection_changed(&mut self) -> bool {
        let fresh = self.refresher.schedule();
        if !fresh {
            debug!("recomputation already pending");
        }
        fresh
    }

    pub fn recompute_pending(&self) -> bool {
        self.refresher.is_pending()
    }

    /// Computes the series if a recomputation is pending.
    pub fn take_recompute(&mut self, data: &DataSet) -> Option<SeriesSet> {
        let (runs, cases, mode) = (&self.runs, &self.cases, self.mode);
        self.refresher
            .run_pending(|| MetricsEngine::new(data).compute(mode, runs, cases))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{CaseResult, CaseStatus};
    use crate::hardware::HardwareSignature;
    use crate::loader::LoadedRun;
    use indexmap::IndexMap;

    fn dataset() -> DataSet {
        let run = |sequence: u32, names: &[&str]| LoadedRun {
            meta: RunMeta {
                sequence,
                label: format!("h{sequence}"),
            },
            cases: names
                .iter()
                .map(|n| {
                    (
                        n.to_string(),
                        CaseResult {
                            name: n.to_string(),
                            status: CaseStatus::Success,
                            part_a: Some(1.0),
                            part_b: Some(f64::from(sequence)),
                            progress: Some(0),
                        },
                    )
                })
                .collect::<IndexMap<_, _>>(),
        };
        DataSet {
            signature: HardwareSignature::new("sig"),
            runs: vec![run(1, &["a", "b"]), run(2, &["a", "c"])],
            known_cases: ["a", "b", "c"].iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn scheduler_coalesces() {
        let mut s = RecomputeScheduler::default();
        assert_eq!(s.run_pending(|| 1), None);
        assert!(s.schedule());
        assert!(!s.schedule());
        assert!(!s.schedule());
        assert_eq!(s.run_pending(|| 2), Some(2));
        assert!(!s.is_pending());
        assert!(s.schedule());
    }

    #[test]
    fn burst_of_changes_computes_once() {
        let data = dataset();
        let mut sel = SelectionState::all_of(&data);
        sel.set_cases(["a".to_string()]);
        sel.set_runs(data.runs.iter().rev().map(|r| r.meta.clone()));
        sel.set_mode(MetricMode::Runtime);
        assert!(sel.recompute_pending());

        let set = sel.take_recompute(&data).unwrap();
        assert_eq!(set.x_labels, vec![2, 1]);
        assert_eq!(set.series["a"], vec![Some(3.0), Some(2.0)]);
        assert!(sel.take_recompute(&data).is_none());
    }

    #[test]
    fn select_all_uses_known_case_order() {
        let data = dataset();
        let mut sel = SelectionState::all_of(&data);
        let set = sel.take_recompute(&data).unwrap();
        let names: Vec<&str> = set.series.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(set.series["b"], vec![Some(2.0), None]);
    }

    #[test]
    fn focus_replaces_case_selection() {
        let data = dataset();
        let mut sel = SelectionState::all_of(&data);
        sel.take_recompute(&data);
        sel.focus_case("c");
        assert_eq!(sel.selected_cases().len(), 1);
        assert!(sel.selected_cases().contains("c"));
        assert_eq!(sel.selected_runs().len(), 2);
        let set = sel.take_recompute(&data).unwrap();
        assert_eq!(set.series["c"], vec![None, Some(3.0)]);
    }
}
