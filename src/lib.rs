// Copyright (c) 2025 the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Benchmark every monitoring tag of a repository once, keep the results
//! per processor, and compare them across revisions.

pub mod archive;
pub mod error;
pub mod executor;
pub mod hardware;
pub mod loader;
pub mod metrics;
pub mod revision;
pub mod selection;
pub mod vcs;

pub use archive::{CaseResult, CaseStatus, ResultArchive, RunMeta};
pub use error::{Error, HardwareError, ParseError, Result, VcsError};
pub use executor::{Benchmark, BenchmarkCommand, BenchmarkFailure, RunExecutor, RunSummary};
pub use hardware::HardwareSignature;
pub use loader::{DataSet, LoadedRun, RunLoader};
pub use metrics::{MetricMode, MetricsEngine, SeriesSet};
pub use revision::{Revision, RevisionSource, TagScheme};
pub use selection::{RecomputeScheduler, SelectionState};
pub use vcs::{GitRepository, Vcs};

/// Installs the stderr log subscriber shared by the binaries. `RUST_LOG`
/// wins over `verbosity`.
pub fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
