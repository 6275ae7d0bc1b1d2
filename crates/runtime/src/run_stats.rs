//! Timing stats from a completed simulation.

use serde::{Deserialize, Serialize};

/// Simulated times of phase transitions, `None` if the transition never happened.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PhaseTimes {
    pub init_completed: Option<f64>,
    pub map_started: Option<f64>,
    pub shuffle_started: Option<f64>,
    pub map_completed: Option<f64>,
    pub shuffle_completed: Option<f64>,
    pub reduce_started: Option<f64>,
    pub reduce_completed: Option<f64>,
}

/// Timing stats from a completed simulation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Simulated time of the last event.
    pub total_time: f64,
    /// Whether the coordinator reached the end of the reduce phase.
    pub completed: bool,
    /// Number of executed map tasks.
    pub map_tasks: u64,
    /// Number of completed shuffle transfers.
    pub transfers: u64,
    /// Number of executed reduce tasks.
    pub reduce_tasks: u64,
    /// Average execution time of a map task.
    pub average_map_time: f64,
    /// Average time between the start of a shuffle transfer and its acknowledgement.
    pub average_shuffle_time: f64,
    /// Average execution time of a reduce task.
    pub average_reduce_time: f64,
    pub phases: PhaseTimes,
    /// Signals the coordinator could not place in the current phase.
    pub protocol_errors: usize,
}

fn push_average(average: &mut f64, count: &mut u64, value: f64) {
    *average = (*average * *count as f64 + value) / (*count + 1) as f64;
    *count += 1;
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_map_task(&mut self, elapsed: f64) {
        push_average(&mut self.average_map_time, &mut self.map_tasks, elapsed);
    }

    pub fn register_transfer(&mut self, elapsed: f64) {
        push_average(&mut self.average_shuffle_time, &mut self.transfers, elapsed);
    }

    pub fn register_reduce_task(&mut self, elapsed: f64) {
        push_average(&mut self.average_reduce_time, &mut self.reduce_tasks, elapsed);
    }

    pub fn register_protocol_error(&mut self) {
        self.protocol_errors += 1;
    }

    pub fn finalize(&mut self, total_time: f64, completed: bool) {
        self.total_time = total_time;
        self.completed = completed;
    }
}
