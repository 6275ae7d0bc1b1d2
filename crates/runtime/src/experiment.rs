//! Calibration of the map and reduce factors against measured times.

use std::{
    fmt,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use dslab_hadoop_cluster::{job_config::JobConfig, platform::PlatformConfig, registry::HostRegistry};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use threadpool::ThreadPool;

use crate::{
    cluster_simulation::{ClusterSimulation, SimulationError},
    params::{CalibrationFactors, CostModel},
    reference::{ReferenceRow, ReferenceTable, Report},
};

/// Inclusive range of factor values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactorRange {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl FactorRange {
    pub fn new(start: f64, end: f64, step: f64) -> Self {
        FactorRange { start, end, step }
    }

    pub fn values(&self) -> Vec<f64> {
        if self.step <= 0. || self.end < self.start {
            return vec![self.start];
        }
        let steps = ((self.end - self.start) / self.step + 1e-9).floor() as usize;
        (0..=steps).map(|i| self.start + i as f64 * self.step).collect()
    }
}

impl Default for FactorRange {
    fn default() -> Self {
        FactorRange::new(0., 2., 0.01)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RunResult {
    pub report: Report,
    pub completed: bool,
}

impl RunResult {
    pub fn factors(&self) -> CalibrationFactors {
        self.report.factors
    }
}

pub struct Experiment {
    seed: u64,
    job: JobConfig,
    platform: PlatformConfig,
    cost_model: CostModel,
    reference: Option<ReferenceRow>,
}

impl Experiment {
    /// Checks that the job can be placed on the platform, every run rebuilds the cluster on its own.
    pub fn new(
        seed: u64,
        job: JobConfig,
        platform: PlatformConfig,
        cost_model: CostModel,
        reference: Option<ReferenceRow>,
    ) -> Result<Self, SimulationError> {
        HostRegistry::from_config(&job, &platform)?;
        Ok(Self {
            seed,
            job,
            platform,
            cost_model,
            reference,
        })
    }

    pub fn run_single(&self, factors: CalibrationFactors) -> Result<RunResult, SimulationError> {
        run_once(
            self.seed,
            &self.job,
            self.platform.clone(),
            self.cost_model.clone(),
            self.reference.as_ref(),
            factors,
        )
    }

    /// Simulates every pair of factors from the two ranges.
    pub fn run_grid(&self, map: FactorRange, reduce: FactorRange, threads: usize) -> Vec<RunResult> {
        let runs = map
            .values()
            .into_iter()
            .cartesian_product(reduce.values())
            .map(|(map, reduce)| CalibrationFactors { map, reduce })
            .collect::<Vec<_>>();
        let total_runs = runs.len();

        let finished_run_atomic = Arc::new(AtomicUsize::new(0));
        let results = Arc::new(Mutex::new(Vec::new()));

        let pool = ThreadPool::new(threads.max(1));
        let start_time = Instant::now();
        for factors in runs.into_iter() {
            let finished_run_atomic = finished_run_atomic.clone();
            let results = results.clone();
            let seed = self.seed;
            let job = self.job.clone();
            let platform = self.platform.clone();
            let cost_model = self.cost_model.clone();
            let reference = self.reference.clone();
            pool.execute(move || {
                match run_once(seed, &job, platform, cost_model, reference.as_ref(), factors) {
                    Ok(result) => results.lock().unwrap().push(result),
                    Err(e) => log::error!("run with factors {:?} failed: {}", factors, e),
                }

                let finished_runs = finished_run_atomic.fetch_add(1, Ordering::SeqCst) + 1;
                let elapsed = start_time.elapsed();
                let remaining = Duration::from_secs_f64(
                    elapsed.as_secs_f64() / finished_runs as f64 * (total_runs - finished_runs) as f64,
                );
                print!("\r{}", " ".repeat(70));
                print!(
                    "\rFinished {}/{} [{}%] runs in {:.2?}, remaining time: {:.2?}",
                    finished_runs,
                    total_runs,
                    (finished_runs as f64 * 100. / total_runs as f64).round() as i32,
                    elapsed,
                    remaining
                );
                let _ = std::io::stdout().flush();
            });
        }

        pool.join();

        print!("\r{}", " ".repeat(70));
        println!("\rFinished {} runs in {:.2?}", total_runs, start_time.elapsed());

        let results = match Arc::try_unwrap(results) {
            Ok(results) => results.into_inner().unwrap(),
            Err(results) => results.lock().unwrap().clone(),
        };
        let mut results = results;
        results.sort_by(|a, b| {
            let (a, b) = (a.factors(), b.factors());
            a.map.total_cmp(&b.map).then(a.reduce.total_cmp(&b.reduce))
        });
        results
    }

    /// Scans the map factor upward with a unit reduce factor while the map difference does not grow,
    /// then scans the reduce factor the same way with the best map factor fixed.
    /// Returns every simulated run, the last one uses the best pair.
    pub fn run_greedy(&self, map: FactorRange, reduce: FactorRange) -> Result<Vec<RunResult>, SimulationError> {
        let mut results = Vec::new();

        let mut best_map = map.start;
        let mut best_diff = f64::MAX;
        for value in map.values() {
            let result = self.run_single(CalibrationFactors { map: value, reduce: 1. })?;
            let diff = result.report.map_diff().unwrap_or(f64::MAX);
            results.push(result);
            if diff > best_diff {
                break;
            }
            best_map = value;
            best_diff = diff;
        }
        log::info!("best map factor: {:.2}", best_map);

        let mut best_reduce = reduce.start;
        let mut best_diff = f64::MAX;
        for value in reduce.values() {
            let result = self.run_single(CalibrationFactors {
                map: best_map,
                reduce: value,
            })?;
            let diff = result.report.reduce_diff().unwrap_or(f64::MAX);
            results.push(result);
            if diff > best_diff {
                break;
            }
            best_reduce = value;
            best_diff = diff;
        }
        log::info!("best reduce factor: {:.2}", best_reduce);

        results.push(self.run_single(CalibrationFactors {
            map: best_map,
            reduce: best_reduce,
        })?);
        Ok(results)
    }
}

/// Job shape simulated by one trial, the hosts come from the base job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialConfig {
    pub input_size_mb: u64,
    pub chunk_size_mb: u64,
    pub reducers: u64,
}

impl TrialConfig {
    pub fn new(input_size_mb: u64, chunk_size_mb: u64, reducers: u64) -> Self {
        TrialConfig {
            input_size_mb,
            chunk_size_mb,
            reducers,
        }
    }

    /// Job configurations measured on the reference cluster, plus the 256 MB inputs.
    pub fn defaults() -> Vec<TrialConfig> {
        [256, 512]
            .into_iter()
            .flat_map(|input| [32, 64, 128].into_iter().map(move |chunk| (input, chunk)))
            .filter(|&(input, chunk)| input == 512 || chunk != 128)
            .flat_map(|(input, chunk)| [4, 8, 16].into_iter().map(move |reducers| (input, chunk, reducers)))
            .map(|(input, chunk, reducers)| TrialConfig::new(input, chunk, reducers))
            .collect()
    }

    fn apply(&self, job: &JobConfig) -> JobConfig {
        let mut job = job.clone();
        job.input_size_mb = self.input_size_mb;
        job.chunk_size_mb = self.chunk_size_mb;
        job.reducers = self.reducers;
        job
    }
}

impl fmt::Display for TrialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.input_size_mb, self.chunk_size_mb, self.reducers)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TrialResult {
    pub config: TrialConfig,
    pub report: Report,
    pub completed: bool,
}

impl Experiment {
    /// Simulates the base job resized to every trial config with the same factors.
    /// Each report is compared against the matching row of `references`, if any.
    pub fn run_trials(
        &self,
        factors: CalibrationFactors,
        trials: &[TrialConfig],
        references: &ReferenceTable,
    ) -> Result<Vec<TrialResult>, SimulationError> {
        let mut results = Vec::with_capacity(trials.len());
        for trial in trials {
            let job = trial.apply(&self.job);
            let reference = references.lookup(trial.input_size_mb, trial.chunk_size_mb, trial.reducers);
            if reference.is_none() {
                log::debug!("no measurements for {}", trial);
            }
            let result = run_once(
                self.seed,
                &job,
                self.platform.clone(),
                self.cost_model.clone(),
                reference,
                factors,
            )?;
            results.push(TrialResult {
                config: *trial,
                report: result.report,
                completed: result.completed,
            });
        }
        Ok(results)
    }
}

fn run_once(
    seed: u64,
    job: &JobConfig,
    platform: PlatformConfig,
    cost_model: CostModel,
    reference: Option<&ReferenceRow>,
    factors: CalibrationFactors,
) -> Result<RunResult, SimulationError> {
    let sim = ClusterSimulation::new(seed, job, platform, factors, cost_model)?;
    let result = sim.run();
    Ok(RunResult {
        report: Report::new(factors, &result.stats, reference),
        completed: result.stats.completed,
    })
}

/// Orders results by the phase difference relative to the measured total, best first.
pub fn rank_by_diff_percent(results: &mut [RunResult]) {
    results.sort_by(|a, b| {
        let a = a.report.diff_percent().unwrap_or(f64::MAX);
        let b = b.report.diff_percent().unwrap_or(f64::MAX);
        a.total_cmp(&b)
    });
}

/// Orders results by the relative error of the total time, best first.
pub fn rank_by_sim_err(results: &mut [RunResult]) {
    results.sort_by(|a, b| {
        let a = a.report.sim_err().unwrap_or(f64::MAX);
        let b = b.report.sim_err().unwrap_or(f64::MAX);
        a.total_cmp(&b)
    });
}

fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |value| format!("{:.2}", value))
}

/// Writes results as an aligned table in their current order.
pub fn write_ranking<P: AsRef<Path>>(path: P, results: &[RunResult]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(
        writer,
        "{:>5} {:>8} {:>9} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>8} {:>12} {:>8}",
        "rank",
        "map_cf",
        "reduce_cf",
        "sim_map",
        "ref_map",
        "sim_red",
        "ref_red",
        "sim_total",
        "ref_total",
        "sim_err",
        "sum_of_diffs",
        "diff_%"
    )?;
    for (rank, result) in results.iter().enumerate() {
        let report = &result.report;
        let reference = report.reference.as_ref();
        writeln!(
            writer,
            "{:>5} {:>8.2} {:>9.2} {:>10.2} {:>10} {:>10.2} {:>10} {:>10.2} {:>10} {:>8} {:>12} {:>8}",
            rank + 1,
            report.factors.map,
            report.factors.reduce,
            report.map,
            format_optional(reference.map(|r| r.map)),
            report.reduce,
            format_optional(reference.map(|r| r.reduce)),
            report.total,
            format_optional(reference.map(|r| r.total)),
            format_optional(report.sim_err()),
            format_optional(report.sum_of_diffs()),
            format_optional(report.diff_percent()),
        )?;
    }
    writer.flush()
}

/// Writes trial results as a table, `-` marks values without measurements.
pub fn write_trials<W: Write>(
    writer: &mut W,
    factors: CalibrationFactors,
    results: &[TrialResult],
) -> std::io::Result<()> {
    writeln!(writer, "Calibration factors: {:.2}, {:.2}", factors.map, factors.reduce)?;
    writeln!(
        writer,
        "{:<12} {:>10} {:>10} {:>10} {:>8} {:>12}",
        "Config", "Map", "Reduce", "Sim_Time", "Sim_Err", "Sum_of_Diffs"
    )?;
    for result in results {
        let report = &result.report;
        writeln!(
            writer,
            "{:<12} {:>10.2} {:>10.2} {:>10.2} {:>8} {:>12}",
            result.config.to_string(),
            report.map,
            report.reduce,
            report.total,
            format_optional(report.sim_err()),
            format_optional(report.sum_of_diffs()),
        )?;
    }
    writer.flush()
}
