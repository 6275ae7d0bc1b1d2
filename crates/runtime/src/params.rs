//! Cost model of the simulated job.

use dslab_hadoop_cluster::job_config::{JobConfig, BYTES_PER_MB};
use serde::{Deserialize, Serialize};

/// Scalars tuning the assumed cost of map and reduce work to match measurements.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFactors {
    pub map: f64,
    pub reduce: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CostModel {
    pub map_flops_per_mb: f64,
    pub reduce_flops_per_mb: f64,
    /// Process spawn overhead on a worker, in seconds of host time.
    pub init_seconds: f64,
    pub shufflers_per_reducer: u64,
    /// Delay before an idle shuffle sender checks its queue again.
    pub shuffle_poll_interval: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel {
            map_flops_per_mb: 13.6,
            reduce_flops_per_mb: 5.25,
            init_seconds: 30.,
            shufflers_per_reducer: 5,
            shuffle_poll_interval: 1.,
        }
    }
}

/// Job sizes together with the cost model, everything needed to price a task.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobParams {
    pub factors: CalibrationFactors,
    pub cost_model: CostModel,
    pub input_size_mb: u64,
    pub chunk_size_mb: u64,
    pub reducers: u64,
}

impl JobParams {
    pub fn new(job: &JobConfig, factors: CalibrationFactors, cost_model: CostModel) -> Self {
        JobParams {
            factors,
            cost_model,
            input_size_mb: job.input_size_mb,
            chunk_size_mb: job.chunk_size_mb,
            reducers: job.reducers,
        }
    }

    pub fn input_size_bytes(&self) -> u64 {
        self.input_size_mb * BYTES_PER_MB
    }

    pub fn chunk_size_bytes(&self) -> u64 {
        self.chunk_size_mb * BYTES_PER_MB
    }

    pub fn map_task_count(&self) -> u64 {
        self.input_size_bytes().div_ceil(self.chunk_size_bytes())
    }

    /// Flops of one map task on a host with the given speed.
    pub fn map_cost(&self, host_speed: f64) -> f64 {
        self.factors.map * self.chunk_size_mb as f64 * self.cost_model.map_flops_per_mb * host_speed
    }

    /// Bytes sent by one shuffle transfer.
    pub fn shuffle_bytes(&self) -> f64 {
        (self.chunk_size_bytes() / self.reducers) as f64
    }

    /// Flops of one reduce task on a host with the given speed.
    pub fn reduce_cost(&self, host_speed: f64) -> f64 {
        self.factors.reduce
            * (self.input_size_mb / self.reducers) as f64
            * self.cost_model.reduce_flops_per_mb
            * host_speed
    }

    pub fn init_cost(&self, host_speed: f64) -> f64 {
        self.cost_model.init_seconds * host_speed
    }
}
