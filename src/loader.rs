// Copyright (c) 2025 the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::archive::{CaseResult, ResultArchive, RunMeta};
use crate::error::Result;
use crate::hardware::HardwareSignature;
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LoadedRun {
    pub meta: RunMeta,
    /// Keyed by case name. A name repeated within a file keeps its first
    /// position and its last value.
    pub cases: IndexMap<String, CaseResult>,
}

/// Everything recorded for one hardware signature.
#[derive(Debug, Clone)]
pub struct DataSet {
    pub signature: HardwareSignature,
    /// Sorted by sequence.
    pub runs: Vec<LoadedRun>,
    /// Case names in the order they were first seen, scanning runs by
    /// ascending sequence.
    pub known_cases: IndexSet<String>,
}

impl DataSet {
    pub fn run(&self, meta: &RunMeta) -> Option<&LoadedRun> {
        self.runs.iter().find(|run| &run.meta == meta)
    }

    pub fn run_metas(&self) -> impl Iterator<Item = &RunMeta> {
        self.runs.iter().map(|run| &run.meta)
    }
}

pub struct RunLoader<'a> {
    archive: &'a ResultArchive,
}

impl<'a> RunLoader<'a> {
    pub fn new(archive: &'a ResultArchive) -> Self {
        Self { archive }
    }

    pub fn load(&self, signature: &HardwareSignature) -> Result<DataSet> {
        let mut metas = self.archive.list(signature)?;
        metas.sort();

        let mut known_cases = IndexSet::new();
        let mut runs = Vec::with_capacity(metas.len());
        for meta in metas {
            let mut cases = IndexMap::new();
            for case in self.archive.open(signature, &meta)? {
                known_cases.insert(case.name.clone());
                cases.insert(case.name.clone(), case);
            }
            debug!(sequence = meta.sequence, label = %meta.label, cases = cases.len(), "loaded run");
            runs.push(LoadedRun { meta, cases });
        }
        Ok(DataSet {
            signature: signature.clone(),
            runs,
            known_cases,
        })
    }
}
