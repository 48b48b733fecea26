// Copyright (c) 2025 the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::archive::ResultArchive;
use crate::error::{Error, Result};
use crate::hardware::HardwareSignature;
use crate::revision::Revision;
use crate::vcs::Vcs;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::{debug, warn};

/// Benchmark output lands here, in the archive root, until it is complete.
pub const TMP_OUTPUT: &str = "tmp_out.csv";

macro_rules! print_flush {
    ($($arg:tt)*) => {{
        print!($($arg)*);
        let _ = io::stdout().flush();
    }};
}

/// Why a single revision produced no result. Never aborts a batch.
#[derive(Error, Debug)]
pub enum BenchmarkFailure {
    #[error("benchmark exited with {0}")]
    Exit(ExitStatus),

    #[error("can't launch benchmark: {0}")]
    Spawn(#[source] io::Error),
}

/// Something that runs the benchmark suite against the checked out tree.
pub trait Benchmark {
    /// Runs the suite in `workdir`, writing its CSV output to `output`.
    fn run(&mut self, workdir: &Path, output: File) -> Result<(), BenchmarkFailure>;
}

/// An external benchmark process. Stdin is closed, stdout is the result
/// and stderr is passed through.
#[derive(Debug, Clone)]
pub struct BenchmarkCommand {
    program: String,
    args: Vec<String>,
}

impl BenchmarkCommand {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `argv[0]` is the program. `None` if `argv` is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program, args))
    }
}

impl Default for BenchmarkCommand {
    fn default() -> Self {
        Self::new("cargo", ["bench", "--bench", "monitoring"])
    }
}

impl Benchmark for BenchmarkCommand {
    fn run(&mut self, workdir: &Path, output: File) -> Result<(), BenchmarkFailure> {
        debug!(program = %self.program, args = ?self.args, "launching benchmark");
        let status = Command::new(&self.program)
            .args(&self.args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(output)
            .status()
            .map_err(BenchmarkFailure::Spawn)?;
        if status.success() {
            Ok(())
        } else {
            Err(BenchmarkFailure::Exit(status))
        }
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub computed: Vec<Revision>,
    pub skipped: Vec<Revision>,
    pub failed: Vec<(Revision, BenchmarkFailure)>,
}

/// Fills the archive with one run per revision, skipping revisions that
/// already have one. Interrupting it at any point leaves the archive
/// valid, and running it again picks up where it stopped.
pub struct RunExecutor<'a, V: Vcs + ?Sized> {
    vcs: &'a V,
    archive: &'a ResultArchive,
    signature: &'a HardwareSignature,
}

impl<'a, V: Vcs + ?Sized> RunExecutor<'a, V> {
    pub fn new(vcs: &'a V, archive: &'a ResultArchive, signature: &'a HardwareSignature) -> Self {
        Self {
            vcs,
            archive,
            signature,
        }
    }

    /// Processes `revisions` in order, one at a time. Checkout failures and
    /// archive I/O errors are fatal; benchmark failures are recorded in the
    /// summary. The working tree is left at the last revision checked out.
    pub fn run(
        &self,
        revisions: &[Revision],
        benchmark: &mut dyn Benchmark,
    ) -> Result<RunSummary> {
        let outdir = self.archive.dir_for(self.signature);
        fs::create_dir_all(&outdir).map_err(|e| Error::io(&outdir, e))?;

        let mut summary = RunSummary::default();
        for rev in revisions {
            let final_path = self.archive.path_for(self.signature, rev);
            if final_path.exists() {
                println!(
                    "Skipping tag {} ({}) because it is already there",
                    rev.tag, rev.hash
                );
                summary.skipped.push(rev.clone());
                continue;
            }

            print_flush!("Computing tag {} ({})...", rev.tag, rev.hash);
            self.vcs.checkout(&rev.hash)?;
            match self.compute(benchmark, &final_path)? {
                Ok(()) => {
                    println!("done!");
                    summary.computed.push(rev.clone());
                }
                Err(failure) => {
                    println!("failed!");
                    println!("Something went wrong with tag {} ({}): {failure}", rev.tag, rev.hash);
                    warn!(tag = %rev.tag, hash = %rev.hash, %failure, "benchmark failed");
                    summary.failed.push((rev.clone(), failure));
                }
            }
        }
        Ok(summary)
    }

    /// Runs the benchmark into the temporary file and renames it into place
    /// on success. The rename is the only way a run file comes to exist.
    fn compute(
        &self,
        benchmark: &mut dyn Benchmark,
        final_path: &Path,
    ) -> Result<Result<(), BenchmarkFailure>> {
        // One reused name: an interrupted run leaves at most this file, and
        // the next run truncates it.
        let tmp = self.archive.root().join(TMP_OUTPUT);
        let output = File::create(&tmp).map_err(|e| Error::io(&tmp, e))?;

        if let Err(failure) = benchmark.run(self.vcs.workdir(), output) {
            match fs::remove_file(&tmp) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(Error::io(&tmp, e)),
                _ => {}
            }
            return Ok(Err(failure));
        }
        fs::rename(&tmp, final_path).map_err(|e| Error::io(final_path, e))?;
        debug!(path = %final_path.display(), "published run");
        Ok(Ok(()))
    }
}
