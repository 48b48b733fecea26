// Copyright (c) 2025 the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Result, eyre};
use perfmon::metrics::{Scale, regressions};
use perfmon::revision::DEFAULT_TAG_PREFIX;
use perfmon::{
    DataSet, HardwareSignature, MetricMode, ResultArchive, RunLoader, SelectionState, SeriesSet,
};
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    /// Run time of successful cases, in seconds
    Runtime,
    /// Progress around timeouts, relative to the first value shown
    Progress,
}

impl From<Mode> for MetricMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Runtime => MetricMode::Runtime,
            Mode::Progress => MetricMode::Progress,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "perfmon-report")]
#[command(about = "Compare archived benchmark runs across revisions", long_about = None)]
struct Args {
    /// Directory holding the results, one subdirectory per processor
    #[arg(short = 'd', long = "runs-dir", env = "PERFMON_RUNS_DIR", default_value = "runs")]
    runs_dir: PathBuf,

    /// Prefix of monitoring tags
    #[arg(short = 't', long = "tag-prefix", default_value = DEFAULT_TAG_PREFIX)]
    tag_prefix: String,

    /// Hardware signature to look at [default: this machine's, else the first one]
    #[arg(short = 's', long = "data-set")]
    data_set: Option<String>,

    /// List data sets, runs and cases instead of comparing
    #[arg(short = 'l', long = "list")]
    list: bool,

    #[arg(short = 'm', long = "mode", value_enum, default_value_t = Mode::Runtime)]
    mode: Mode,

    /// First run sequence number to include
    #[arg(long = "from")]
    from: Option<u32>,

    /// Last run sequence number to include
    #[arg(long = "to")]
    to: Option<u32>,

    /// Case to include (repeatable) [default: all]
    #[arg(short = 'c', long = "case")]
    cases: Vec<String>,

    /// Relative change between consecutive runs worth reporting
    #[arg(long = "threshold", default_value = "0.05")]
    threshold: f64,

    /// More logging on stderr (repeatable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

const BAR_WIDTH: usize = 50;

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    perfmon::init_logging(args.verbose);

    let archive = ResultArchive::with_prefix(&args.runs_dir, &args.tag_prefix);
    let data_sets = archive.signatures()?;
    let signature = pick_data_set(&args, &data_sets)?;
    let data = RunLoader::new(&archive).load(&signature)?;

    if args.list {
        print_listing(&data, &data_sets);
        return Ok(());
    }

    let mut selection = SelectionState::all_of(&data);
    if args.from.is_some() || args.to.is_some() {
        let from = args.from.unwrap_or(0);
        let to = args.to.unwrap_or(u32::MAX);
        selection.set_runs(
            data.run_metas()
                .filter(|m| (from..=to).contains(&m.sequence))
                .cloned(),
        );
    }
    if !args.cases.is_empty() {
        for case in args.cases.iter().filter(|c| !data.known_cases.contains(*c)) {
            warn!(%case, "unknown case");
        }
        selection.set_cases(args.cases.iter().cloned());
    }
    selection.set_mode(args.mode.into());

    let set = selection
        .take_recompute(&data)
        .ok_or_else(|| eyre!("nothing to compute"))?;
    print_series(&data, &selection, &set);
    print_changes(&selection, &set, args.threshold);
    Ok(())
}

fn pick_data_set(args: &Args, data_sets: &[HardwareSignature]) -> Result<HardwareSignature> {
    if let Some(name) = &args.data_set {
        let sig = HardwareSignature::new(name.as_str());
        return if data_sets.contains(&sig) {
            Ok(sig)
        } else {
            Err(eyre!("no data set {name} in {}", args.runs_dir.display()))
        };
    }
    if let Ok(own) = HardwareSignature::detect()
        && data_sets.contains(&own)
    {
        return Ok(own);
    }
    debug!("this machine has no data set, using the first one");
    data_sets
        .first()
        .cloned()
        .ok_or_else(|| eyre!("no data sets in {}", args.runs_dir.display()))
}

fn print_listing(data: &DataSet, data_sets: &[HardwareSignature]) {
    println!("Data sets:");
    for sig in data_sets {
        let marker = if *sig == data.signature { "*" } else { " " };
        println!(" {marker} {sig}");
    }
    println!("\nRuns:");
    for meta in data.run_metas() {
        println!("  {:>5}  {}", meta.sequence, meta.label);
    }
    println!("\nCases:");
    for case in &data.known_cases {
        println!("  {case}");
    }
}

fn print_series(data: &DataSet, selection: &SelectionState, set: &SeriesSet) {
    let axis = set.axis();
    println!("{}", "=".repeat(80));
    println!("{} on {}", axis.label, data.signature);
    println!("{}", "=".repeat(80));

    for (case, values) in set.visible() {
        println!("\n{case}");
        let (lo, hi) = range(values, axis.scale, axis.reference);
        for (meta, value) in selection.selected_runs().iter().zip(values) {
            let shown = match value {
                Some(v) => format!("{v:>12.4}"),
                None => format!("{:>12}", "-"),
            };
            let plot = value
                .map(|v| bar(v, lo, hi, axis.scale, axis.reference))
                .unwrap_or_default();
            println!("  [{:>5}] {:.8} {shown} {plot}", meta.sequence, meta.hash());
        }
    }

    let hidden: Vec<&str> = set.hidden().collect();
    if !hidden.is_empty() {
        println!("\nNo data for: {}", hidden.join(", "));
    }
}

fn print_changes(selection: &SelectionState, set: &SeriesSet, threshold: f64) {
    let changes = regressions(set, threshold);
    println!("\n{}", "-".repeat(80));
    if changes.is_empty() {
        println!("No change above {:.1}%", 100.0 * threshold);
        return;
    }
    println!("Changes above {:.1}%:", 100.0 * threshold);
    let runs = selection.selected_runs();
    for change in changes {
        let direction = match (set.mode, change.is_increase()) {
            (MetricMode::Runtime, true) => "slower",
            (MetricMode::Runtime, false) => "faster",
            (MetricMode::Progress, true) => "more progress",
            (MetricMode::Progress, false) => "less progress",
        };
        println!(
            "  {:<40} {:>5} -> {:<5} {:>+8.1}% {direction}",
            change.case,
            runs[change.from].sequence,
            runs[change.to].sequence,
            100.0 * (change.ratio - 1.0)
        );
    }
}

fn scaled(value: f64, scale: Scale) -> Option<f64> {
    match scale {
        Scale::Linear => Some(value),
        Scale::Log if value > 0.0 => Some(value.ln()),
        Scale::Log => None,
    }
}

fn range(values: &[Option<f64>], scale: Scale, reference: Option<f64>) -> (f64, f64) {
    let mut lo = f64::MAX;
    let mut hi = f64::MIN;
    for v in values.iter().flatten().chain(&reference) {
        if let Some(s) = scaled(*v, scale) {
            lo = lo.min(s);
            hi = hi.max(s);
        }
    }
    (lo, hi)
}

fn position(scaled_value: f64, lo: f64, hi: f64) -> usize {
    if hi <= lo {
        return BAR_WIDTH / 2;
    }
    let max = (BAR_WIDTH - 1) as f64;
    ((scaled_value - lo) / (hi - lo) * max).round().clamp(0.0, max) as usize
}

fn bar(value: f64, lo: f64, hi: f64, scale: Scale, reference: Option<f64>) -> String {
    let Some(v) = scaled(value, scale) else {
        return String::new();
    };
    let mut bar = vec!['─'; BAR_WIDTH];
    if let Some(r) = reference.and_then(|r| scaled(r, scale)) {
        bar[position(r, lo, hi)] = '┊';
    }
    bar[position(v, lo, hi)] = '●';
    format!("|{}|", bar.into_iter().collect::<String>())
}
