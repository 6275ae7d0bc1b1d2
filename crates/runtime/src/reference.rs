//! Measured phase times and the comparison of a simulated run against them.

use std::{
    fmt,
    fs::{File, OpenOptions},
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{params::CalibrationFactors, run_stats::RunStats};

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("can't read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't parse reference table: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Times measured on a real cluster for one job configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRow {
    pub input_size_mb: u64,
    pub chunk_size_mb: u64,
    pub reducers: u64,
    /// Average map task time.
    pub map: f64,
    /// Average reduce task time.
    pub reduce: f64,
    /// Job execution time.
    pub total: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferenceTable {
    pub rows: Vec<ReferenceRow>,
}

impl Default for ReferenceTable {
    /// Measurements for a 512 MB input.
    fn default() -> Self {
        let measurements = [
            (32, 4, 438., 672., 1172.),
            (32, 8, 432., 338., 833.),
            (32, 16, 425., 187., 682.),
            (64, 4, 833., 664., 1562.),
            (64, 8, 821., 342., 1221.),
            (64, 16, 809., 184., 1126.),
            (128, 4, 1638., 667., 2237.),
            (128, 8, 1616., 338., 2031.),
            (128, 16, 998., 183., 1851.),
        ];
        ReferenceTable {
            rows: measurements
                .into_iter()
                .map(|(chunk_size_mb, reducers, map, reduce, total)| ReferenceRow {
                    input_size_mb: 512,
                    chunk_size_mb,
                    reducers,
                    map,
                    reduce,
                    total,
                })
                .collect(),
        }
    }
}

impl ReferenceTable {
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ReferenceError> {
        let file = File::open(path.as_ref()).map_err(|source| ReferenceError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_reader(BufReader::new(file))?)
    }

    pub fn lookup(&self, input_size_mb: u64, chunk_size_mb: u64, reducers: u64) -> Option<&ReferenceRow> {
        self.rows.iter().find(|row| {
            row.input_size_mb == input_size_mb && row.chunk_size_mb == chunk_size_mb && row.reducers == reducers
        })
    }
}

/// Simulated times of one run, compared against a reference row if there is one.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub factors: CalibrationFactors,
    pub map: f64,
    pub reduce: f64,
    pub total: f64,
    pub reference: Option<ReferenceRow>,
}

impl Report {
    pub fn new(factors: CalibrationFactors, stats: &RunStats, reference: Option<&ReferenceRow>) -> Self {
        Report {
            factors,
            map: stats.average_map_time,
            reduce: stats.average_reduce_time,
            total: stats.total_time,
            reference: reference.cloned(),
        }
    }

    pub fn map_diff(&self) -> Option<f64> {
        self.reference.as_ref().map(|r| (self.map - r.map).abs())
    }

    pub fn reduce_diff(&self) -> Option<f64> {
        self.reference.as_ref().map(|r| (self.reduce - r.reduce).abs())
    }

    pub fn sum_of_diffs(&self) -> Option<f64> {
        Some(self.map_diff()? + self.reduce_diff()?)
    }

    /// Relative error of the total time, in percent.
    pub fn sim_err(&self) -> Option<f64> {
        self.reference
            .as_ref()
            .map(|r| (self.total - r.total).abs() / r.total * 100.)
    }

    /// Sum of phase differences relative to the measured total, in percent.
    pub fn diff_percent(&self) -> Option<f64> {
        let reference = self.reference.as_ref()?;
        Some(self.sum_of_diffs()? / reference.total * 100.)
    }

    pub fn results_line(&self) -> Option<String> {
        let reference = self.reference.as_ref()?;
        Some(format!(
            "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} {:.2} {:.2} {:.2} {:.2}",
            self.sum_of_diffs()?,
            self.sim_err()?,
            self.factors.map,
            self.factors.reduce,
            self.map,
            reference.map,
            self.reduce,
            reference.reduce,
            self.total,
            reference.total
        ))
    }

    /// Appends the results line to `path`. Returns `false` if there is nothing to compare against.
    pub fn append_to<P: AsRef<Path>>(&self, path: P) -> std::io::Result<bool> {
        let Some(line) = self.results_line() else {
            return Ok(false);
        };
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", line)?;
        Ok(true)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<12}{:>16}{:>16}{:>18}{:>20}{:>16}",
            "", "Map Phase", "Reduce Phase", "Execution Time", "Simulation Error", "Sum of Diffs"
        )?;
        if let Some(reference) = &self.reference {
            writeln!(
                f,
                "{:<12}{:>16.2}{:>16.2}{:>18.2}",
                "Actual:", reference.map, reference.reduce, reference.total
            )?;
        }
        match (self.sim_err(), self.sum_of_diffs()) {
            (Some(sim_err), Some(sum_of_diffs)) => writeln!(
                f,
                "{:<12}{:>16.2}{:>16.2}{:>18.2}{:>19.2}%{:>16.2}",
                "Simulated:", self.map, self.reduce, self.total, sim_err, sum_of_diffs
            ),
            _ => writeln!(
                f,
                "{:<12}{:>16.2}{:>16.2}{:>18.2}",
                "Simulated:", self.map, self.reduce, self.total
            ),
        }
    }
}
