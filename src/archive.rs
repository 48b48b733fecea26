// Copyright (c) 2025 the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! On-disk layout of benchmark results.
//!
//! Every run is one CSV file at
//! `<root>/<signature>/run.<prefix><sequence>.<label>.csv`, where the
//! label ends with the revision hash. The file name is the only index:
//! listing a signature directory is enough to know which runs exist.

use crate::error::{Error, ParseError, Result};
use crate::hardware::HardwareSignature;
use crate::revision::{DEFAULT_TAG_PREFIX, Revision, split_sequence};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseStatus {
    Success,
    Timedout,
    Other(String),
}

impl CaseStatus {
    fn parse(token: &str) -> Self {
        match token {
            "Success" => CaseStatus::Success,
            "Timedout" => CaseStatus::Timedout,
            other => CaseStatus::Other(other.to_string()),
        }
    }
}

/// One benchmark case of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseResult {
    pub name: String,
    pub status: CaseStatus,
    pub part_a: Option<f64>,
    pub part_b: Option<f64>,
    pub progress: Option<i64>,
}

/// Identity of a run, recovered from its file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunMeta {
    pub sequence: u32,
    /// Everything between the sequence and `.csv`.
    pub label: String,
}

impl RunMeta {
    /// The revision hash is the last dot-separated component of the label.
    pub fn hash(&self) -> &str {
        self.label.rsplit('.').next().unwrap_or(&self.label)
    }

    /// Free-form description preceding the hash, if any.
    pub fn description(&self) -> Option<&str> {
        self.label.rsplit_once('.').map(|(desc, _)| desc)
    }
}

pub struct ResultArchive {
    root: PathBuf,
    prefix: String,
}

impl ResultArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_prefix(root, DEFAULT_TAG_PREFIX)
    }

    pub fn with_prefix(root: impl Into<PathBuf>, prefix: &str) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.to_string(),
        }
    }

    /// Parses `run.<prefix><NNNNN>.<label>.csv`.
    pub fn parse_file_name(&self, name: &str) -> Option<RunMeta> {
        let rest = name.strip_prefix("run.")?;
        let (sequence, rest) = split_sequence(rest, &self.prefix)?;
        let label = rest.strip_prefix('.')?.strip_suffix(".csv")?;
        if label.is_empty() {
            return None;
        }
        Some(RunMeta {
            sequence,
            label: label.to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir_for(&self, signature: &HardwareSignature) -> PathBuf {
        self.root.join(signature.as_str())
    }

    pub fn path_for(&self, signature: &HardwareSignature, revision: &Revision) -> PathBuf {
        self.run_path(
            signature,
            &RunMeta {
                sequence: revision.sequence,
                label: revision.hash.clone(),
            },
        )
    }

    pub fn run_path(&self, signature: &HardwareSignature, meta: &RunMeta) -> PathBuf {
        self.dir_for(signature).join(format!(
            "run.{}{:05}.{}.csv",
            self.prefix, meta.sequence, meta.label
        ))
    }

    /// Signatures that have a directory in the archive, sorted.
    pub fn signatures(&self) -> Result<Vec<HardwareSignature>> {
        let mut signatures = Vec::new();
        for entry in read_dir(&self.root)? {
            let entry = entry.map_err(|e| Error::io(&self.root, e))?;
            if entry.path().is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                signatures.push(HardwareSignature::new(name));
            }
        }
        signatures.sort();
        Ok(signatures)
    }

    /// Runs stored for `signature`, in no particular order. Files not
    /// following the naming convention are ignored. A signature without a
    /// directory has no runs.
    pub fn list(&self, signature: &HardwareSignature) -> Result<Vec<RunMeta>> {
        let dir = self.dir_for(signature);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(dir, e)),
        };
        let mut runs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&dir, e))?;
            let Some(meta) = entry.file_name().to_str().and_then(|n| self.parse_file_name(n)) else {
                continue;
            };
            if entry.path().is_file() {
                runs.push(meta);
            }
        }
        Ok(runs)
    }

    /// Reads every case of one run. Any malformed row fails the whole run.
    pub fn open(&self, signature: &HardwareSignature, meta: &RunMeta) -> Result<Vec<CaseResult>> {
        let path = self.run_path(signature, meta);
        let file = File::open(&path).map_err(|e| Error::io(&path, e))?;
        Ok(read_cases(file, &path)?)
    }
}

fn read_dir(dir: &Path) -> Result<fs::ReadDir> {
    fs::read_dir(dir).map_err(|e| Error::io(dir, e))
}

/// Decodes a run body. The first line is a header and is not validated.
pub fn read_cases(reader: impl io::Read, path: &Path) -> Result<Vec<CaseResult>, ParseError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut cases = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| ParseError {
            path: path.to_path_buf(),
            line: e.position().map_or(0, |p| p.line()),
            reason: e.to_string(),
        })?;
        let line = record.position().map_or(0, |p| p.line());
        let fail = |reason: String| ParseError {
            path: path.to_path_buf(),
            line,
            reason,
        };
        cases.push(decode_row(&record).map_err(fail)?);
    }
    Ok(cases)
}

fn decode_row(record: &csv::StringRecord) -> Result<CaseResult, String> {
    // The harness emits an extra column between the status and the timings.
    let (a, b, progress) = match record.len() {
        0..=4 => return Err(format!("expected at least 5 fields, got {}", record.len())),
        5 => (2, 3, 4),
        _ => (3, 4, 5),
    };
    let name = &record[0];
    if name.is_empty() {
        return Err("empty case name".to_string());
    }
    Ok(CaseResult {
        name: name.to_string(),
        status: CaseStatus::parse(&record[1]),
        part_a: number(&record[a], "first duration")?,
        part_b: number(&record[b], "second duration")?,
        progress: number(&record[progress], "progress counter")?,
    })
}

fn number<T: std::str::FromStr>(field: &str, what: &str) -> Result<Option<T>, String>
where
    T::Err: std::fmt::Display,
{
    if field.is_empty() {
        return Ok(None);
    }
    field
        .parse()
        .map(Some)
        .map_err(|e| format!("invalid {what} `{field}`: {e}"))
}
