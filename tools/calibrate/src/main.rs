use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use dslab_hadoop::{
    experiment::{
        rank_by_diff_percent, rank_by_sim_err, write_ranking, write_trials, Experiment, FactorRange, TrialConfig,
    },
    params::{CalibrationFactors, CostModel},
    reference::ReferenceTable,
};
use dslab_hadoop_cluster::{job_config::JobConfig, platform::PlatformConfig};
use env_logger::Builder;
use serde::Serialize;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Every pair of factors from the two ranges.
    Grid,
    /// Map factor first, then reduce factor, each scanned until the difference grows.
    Greedy,
    /// Fixed factors over the measured job configurations.
    Trials,
}

impl Mode {
    fn default_range(self) -> FactorRange {
        match self {
            Mode::Grid => FactorRange::new(0.8, 1.2, 0.01),
            Mode::Greedy | Mode::Trials => FactorRange::default(),
        }
    }
}

/// Searches calibration factors matching the reference measurements.
#[derive(Parser, Debug)]
struct Args {
    /// Path to job config.
    #[arg(short, long, default_value = "config")]
    config: PathBuf,

    /// Path to platform description, overrides the one from the job config.
    #[arg(short, long)]
    platform: Option<PathBuf>,

    /// Reference measurements in YAML, the built-in table is used by default.
    #[arg(long)]
    reference: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Mode::Grid)]
    mode: Mode,

    /// Defaults to 0.8 for grid and 0 for greedy.
    #[arg(long)]
    map_start: Option<f64>,

    /// Defaults to 1.2 for grid and 2 for greedy.
    #[arg(long)]
    map_end: Option<f64>,

    #[arg(long, default_value_t = 0.01)]
    map_step: f64,

    #[arg(long)]
    reduce_start: Option<f64>,

    #[arg(long)]
    reduce_end: Option<f64>,

    #[arg(long, default_value_t = 0.01)]
    reduce_step: f64,

    /// Map factor of the trials.
    #[arg(long, default_value_t = 0.95)]
    map_cf: f64,

    /// Reduce factor of the trials.
    #[arg(long, default_value_t = 1.02)]
    reduce_cf: f64,

    /// Results ranked by the sum of phase differences.
    #[arg(long, default_value = "ranked_by_diff.txt")]
    ranked_by_diff: PathBuf,

    /// Results ranked by the error of the total time.
    #[arg(long, default_value = "ranked_by_error.txt")]
    ranked_by_error: PathBuf,

    /// Save all results as JSON.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of threads.
    #[arg(long, default_value_t = std::thread::available_parallelism().map_or(1, |n| n.get()))]
    threads: usize,

    #[arg(long, default_value_t = 123)]
    seed: u64,
}

fn save_json<T: Serialize>(path: &Path, results: &T) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("can't create {}", path.display()))?;
    serde_json::to_writer_pretty(file, results)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let args = Args::parse();
    let job = JobConfig::from_file(&args.config)?;
    let platform = PlatformConfig::from_yaml(job.platform_path(args.platform.clone())?)?;
    let references = match &args.reference {
        Some(path) => ReferenceTable::from_yaml(path)
            .with_context(|| format!("can't read reference table {}", path.display()))?,
        None => ReferenceTable::default(),
    };

    if args.mode == Mode::Trials {
        let factors = CalibrationFactors {
            map: args.map_cf,
            reduce: args.reduce_cf,
        };
        let experiment = Experiment::new(args.seed, job, platform, CostModel::default(), None)?;
        let trials = TrialConfig::defaults();
        log::info!("Running {} trials", trials.len());
        let results = experiment.run_trials(factors, &trials, &references)?;
        if let Some(path) = &args.output {
            save_json(path, &results)?;
        }
        write_trials(&mut std::io::stdout().lock(), factors, &results)?;
        return Ok(());
    }

    let reference = references
        .lookup(job.input_size_mb, job.chunk_size_mb, job.reducers)
        .cloned()
        .with_context(|| {
            format!(
                "no measurements for {}-{}-{}",
                job.input_size_mb, job.chunk_size_mb, job.reducers
            )
        })?;

    let defaults = args.mode.default_range();
    let map_range = FactorRange::new(
        args.map_start.unwrap_or(defaults.start),
        args.map_end.unwrap_or(defaults.end),
        args.map_step,
    );
    let reduce_range = FactorRange::new(
        args.reduce_start.unwrap_or(defaults.start),
        args.reduce_end.unwrap_or(defaults.end),
        args.reduce_step,
    );
    log::info!("map factors {:?}, reduce factors {:?}", map_range, reduce_range);
    let experiment = Experiment::new(args.seed, job, platform, CostModel::default(), Some(reference))?;
    let mut results = match args.mode {
        Mode::Greedy => experiment.run_greedy(map_range, reduce_range)?,
        _ => experiment.run_grid(map_range, reduce_range, args.threads),
    };

    if let Some(path) = &args.output {
        save_json(path, &results)?;
    }

    if args.mode == Mode::Greedy {
        if let Some(best) = results.last() {
            println!("{}", best.report);
        }
    }

    rank_by_diff_percent(&mut results);
    write_ranking(&args.ranked_by_diff, &results)
        .with_context(|| format!("can't write {}", args.ranked_by_diff.display()))?;
    if let Some(best) = results.first() {
        println!(
            "Best by sum of diffs: map_cf {:.2}, reduce_cf {:.2}",
            best.report.factors.map, best.report.factors.reduce
        );
    }

    rank_by_sim_err(&mut results);
    write_ranking(&args.ranked_by_error, &results)
        .with_context(|| format!("can't write {}", args.ranked_by_error.display()))?;
    if let Some(best) = results.first() {
        println!(
            "Best by simulation error: map_cf {:.2}, reduce_cf {:.2}",
            best.report.factors.map, best.report.factors.reduce
        );
    }
    log::info!(
        "Rankings saved to {} and {}",
        args.ranked_by_diff.display(),
        args.ranked_by_error.display()
    );
    Ok(())
}
