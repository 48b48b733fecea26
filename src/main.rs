// Copyright (c) 2025 the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use perfmon::revision::DEFAULT_TAG_PREFIX;
use perfmon::{
    BenchmarkCommand, GitRepository, HardwareSignature, ResultArchive, RevisionSource,
    RunExecutor, TagScheme,
};
use std::path::PathBuf;
use std::process;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "perfmon")]
#[command(about = "Benchmark every monitoring tag of a git repository once", long_about = None)]
struct Args {
    /// Path to the git repository to benchmark
    repo: PathBuf,

    /// Directory holding the results, one subdirectory per processor
    #[arg(short = 'd', long = "runs-dir", env = "PERFMON_RUNS_DIR", default_value = "runs")]
    runs_dir: PathBuf,

    /// Prefix of monitoring tags; the prefix is followed by exactly 5 digits
    #[arg(short = 't', long = "tag-prefix", default_value = DEFAULT_TAG_PREFIX)]
    tag_prefix: String,

    /// Use this instead of the signature derived from /proc/cpuinfo
    #[arg(long = "hardware-signature", env = "PERFMON_HARDWARE_SIGNATURE")]
    hardware_signature: Option<String>,

    /// Don't fetch tags from the remote first
    #[arg(long = "no-fetch")]
    no_fetch: bool,

    /// More logging on stderr (repeatable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Benchmark command, run in the repository with its stdout saved as
    /// the result [default: cargo bench --bench monitoring]
    #[arg(last = true)]
    command: Vec<String>,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            process::exit(1);
        }
        Err(e) => e.exit(),
    };
    if let Err(e) = color_eyre::install() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
    perfmon::init_logging(args.verbose);

    if let Err(err) = run(&args) {
        let message: Vec<String> = err.chain().map(ToString::to_string).collect();
        eprintln!("Error: {}", message.join(": "));
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    // Resolved up front, the benchmark runs from inside the repository.
    let runs_dir = std::path::absolute(&args.runs_dir)
        .wrap_err_with(|| format!("can't resolve {}", args.runs_dir.display()))?;
    let signature = match &args.hardware_signature {
        Some(s) => HardwareSignature::new(s.as_str()),
        None => HardwareSignature::detect()?,
    };
    info!(%signature, runs_dir = %runs_dir.display(), "starting");

    let repo = GitRepository::open(&args.repo)
        .wrap_err_with(|| format!("can't open {}", args.repo.display()))?;
    let scheme = TagScheme::new(&args.tag_prefix);
    let mut source = RevisionSource::new(&repo, &scheme);
    if args.no_fetch {
        source = source.without_fetch();
    }
    let revisions = source.discover()?;

    let archive = ResultArchive::with_prefix(runs_dir, &args.tag_prefix);
    let mut benchmark = BenchmarkCommand::from_argv(&args.command).unwrap_or_default();
    let summary = RunExecutor::new(&repo, &archive, &signature).run(&revisions, &mut benchmark)?;

    println!(
        "{} revisions: {} computed, {} already there, {} failed",
        revisions.len(),
        summary.computed.len(),
        summary.skipped.len(),
        summary.failed.len()
    );
    for (rev, failure) in &summary.failed {
        println!("  {} ({}): {failure}", rev.tag, rev.hash);
    }
    Ok(())
}
