// Copyright (c) 2025 the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Turns loaded runs into one aligned series per case.
//!
//! Every series has exactly one slot per selected run, in selection order.
//! An empty slot means "nothing to compare here" and must be drawn as a
//! gap, never as zero.

use crate::archive::{CaseResult, CaseStatus, RunMeta};
use crate::loader::{DataSet, LoadedRun};
use indexmap::{IndexMap, IndexSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricMode {
    /// Seconds taken by successful cases.
    #[default]
    Runtime,
    /// Progress counters around timeouts, relative to the first one shown.
    Progress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Linear,
    Log,
}

/// How a series set should be drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axis {
    pub label: &'static str,
    pub scale: Scale,
    /// Horizontal guide line, if any.
    pub reference: Option<f64>,
}

impl MetricMode {
    pub fn axis(self) -> Axis {
        match self {
            MetricMode::Runtime => Axis {
                label: "Run time (seconds)",
                scale: Scale::Linear,
                reference: None,
            },
            MetricMode::Progress => Axis {
                label: "Relative progress",
                scale: Scale::Log,
                reference: Some(1.0),
            },
        }
    }
}

pub type Series = Vec<Option<f64>>;

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSet {
    pub mode: MetricMode,
    /// Sequence number of each selected run.
    pub x_labels: Vec<u32>,
    /// One entry per selected case, in selection order.
    pub series: IndexMap<String, Series>,
}

impl SeriesSet {
    pub fn axis(&self) -> Axis {
        self.mode.axis()
    }

    /// Cases with at least one value. Only these get drawn and a legend
    /// entry; the others stay selectable.
    pub fn visible(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.series
            .iter()
            .filter(|(_, values)| has_data(values))
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn hidden(&self) -> impl Iterator<Item = &str> {
        self.series
            .iter()
            .filter(|(_, values)| !has_data(values))
            .map(|(name, _)| name.as_str())
    }

    pub fn is_visible(&self, case: &str) -> bool {
        self.series.get(case).is_some_and(|values| has_data(values))
    }
}

fn has_data(values: &[Option<f64>]) -> bool {
    values.iter().any(Option::is_some)
}

pub struct MetricsEngine<'a> {
    data: &'a DataSet,
}

impl<'a> MetricsEngine<'a> {
    pub fn new(data: &'a DataSet) -> Self {
        Self { data }
    }

    /// Runs not present in the data set contribute empty slots.
    pub fn compute(
        &self,
        mode: MetricMode,
        selected_runs: &[RunMeta],
        selected_cases: &IndexSet<String>,
    ) -> SeriesSet {
        let runs: Vec<Option<&LoadedRun>> = selected_runs.iter().map(|m| self.data.run(m)).collect();

        let series = selected_cases
            .iter()
            .map(|case| {
                let results: Vec<Option<&CaseResult>> = runs
                    .iter()
                    .map(|run| run.and_then(|r| r.cases.get(case)))
                    .collect();
                let values = match mode {
                    MetricMode::Runtime => runtime_series(&results),
                    MetricMode::Progress => progress_series(&results),
                };
                (case.clone(), values)
            })
            .collect();

        SeriesSet {
            mode,
            x_labels: selected_runs.iter().map(|m| m.sequence).collect(),
            series,
        }
    }
}

fn runtime_value(result: &CaseResult) -> Option<f64> {
    match result.status {
        CaseStatus::Success => Some(result.part_a? + result.part_b?),
        _ => None,
    }
}

pub fn runtime_series(results: &[Option<&CaseResult>]) -> Series {
    results
        .iter()
        .map(|r| r.and_then(runtime_value))
        .collect()
}

pub fn progress_series(results: &[Option<&CaseResult>]) -> Series {
    let points: Vec<(bool, Option<f64>)> = results
        .iter()
        .map(|r| match r {
            Some(r) => (r.status == CaseStatus::Timedout, r.progress.map(|p| p as f64)),
            None => (false, None),
        })
        .collect();
    let mut values = window(&points);
    normalize(&mut values);
    values
}

/// Keeps a point only if it, or a direct neighbour, timed out. Counters of
/// cases that completed far from any timeout aren't comparable.
pub fn window(points: &[(bool, Option<f64>)]) -> Series {
    let timed_out = |i: usize| points.get(i).is_some_and(|(t, _)| *t);
    points
        .iter()
        .enumerate()
        .map(|(i, (is_timeout, value))| {
            let near_timeout = *is_timeout || (i > 0 && timed_out(i - 1)) || timed_out(i + 1);
            if near_timeout { *value } else { None }
        })
        .collect()
}

/// Divides every value by the first one present, which becomes `1.0`.
///
/// A zero anchor still becomes `1.0`, but the values after it are left as
/// raw counts.
pub fn normalize(values: &mut [Option<f64>]) {
    let mut anchor = None;
    for value in values.iter_mut().flatten() {
        let Some(first) = anchor else {
            anchor = Some(*value);
            *value = 1.0;
            continue;
        };
        if first != 0.0 {
            *value /= first;
        }
    }
}

/// A significant change between two consecutive values of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub case: String,
    /// Indices into the selected runs.
    pub from: usize,
    pub to: usize,
    /// `to / from`.
    pub ratio: f64,
}

impl Change {
    /// In runtime mode a ratio above one is a slowdown. In progress mode it
    /// means more work got done before the timeout.
    pub fn is_increase(&self) -> bool {
        self.ratio > 1.0
    }
}

/// Compares each value with the previous value present in the same
/// series and reports those moving by more than `threshold` (relative).
/// Gaps are skipped over; non-positive baselines are not compared.
pub fn regressions(set: &SeriesSet, threshold: f64) -> Vec<Change> {
    let upper = 1.0 + threshold;
    let mut changes = Vec::new();
    for (case, values) in set.visible() {
        let mut previous: Option<(usize, f64)> = None;
        for (i, value) in values.iter().enumerate() {
            let Some(value) = *value else { continue };
            if let Some((from, base)) = previous
                && base > 0.0
            {
                let ratio = value / base;
                if ratio > upper || ratio < 1.0 / upper {
                    changes.push(Change {
                        case: case.to_string(),
                        from,
                        to: i,
                        ratio,
                    });
                }
            }
            previous = Some((i, value));
        }
    }
    changes
}
