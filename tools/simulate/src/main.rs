use std::{io::Write, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use dslab_hadoop::{
    cluster_simulation::ClusterSimulation,
    params::{CalibrationFactors, CostModel},
    reference::{ReferenceTable, Report},
};
use dslab_hadoop_cluster::{job_config::JobConfig, platform::PlatformConfig};
use env_logger::Builder;

/// Simulates a MapReduce job on a Hadoop cluster and compares phase times with measurements.
#[derive(Parser, Debug)]
struct Args {
    /// Map calibration factor.
    map_cf: f64,

    /// Reduce calibration factor.
    reduce_cf: f64,

    /// Path to job config.
    #[arg(default_value = "config")]
    config: PathBuf,

    /// Path to platform description, overrides the one from the job config.
    platform: Option<PathBuf>,

    /// File the results line is appended to.
    #[arg(short, long, default_value = "simulation_results.txt")]
    results: PathBuf,

    /// Reference measurements in YAML, the built-in table is used by default.
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Save phase transitions as JSON.
    #[arg(long)]
    trace: Option<PathBuf>,

    #[arg(long, default_value_t = 123)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let args = Args::parse();
    let job = JobConfig::from_file(&args.config)?;
    let platform = PlatformConfig::from_yaml(job.platform_path(args.platform)?)?;
    let references = match &args.reference {
        Some(path) => ReferenceTable::from_yaml(path)
            .with_context(|| format!("can't read reference table {}", path.display()))?,
        None => ReferenceTable::default(),
    };

    let factors = CalibrationFactors {
        map: args.map_cf,
        reduce: args.reduce_cf,
    };
    let result = ClusterSimulation::new(args.seed, &job, platform, factors, CostModel::default())?.run();
    log::info!("Simulation time {}", result.stats.total_time);
    if let Some(path) = &args.trace {
        result
            .trace
            .save_json(path)
            .with_context(|| format!("can't save trace to {}", path.display()))?;
    }

    let report = Report::new(
        factors,
        &result.stats,
        references.lookup(job.input_size_mb, job.chunk_size_mb, job.reducers),
    );
    let saved = report
        .append_to(&args.results)
        .with_context(|| format!("can't write results to {}", args.results.display()))?;
    if !saved {
        log::warn!(
            "no measurements for {}-{}-{}, results are not saved",
            job.input_size_mb,
            job.chunk_size_mb,
            job.reducers
        );
    }
    println!("\n{}", report);
    Ok(())
}
