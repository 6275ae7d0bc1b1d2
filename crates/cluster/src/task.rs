//! Units of simulated work.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    Init,
    Map,
    Shuffle,
    Reduce,
}

/// A unit of simulated work, consumed exactly once by the executor which dequeues it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub kind: TaskKind,
    /// Flops to execute.
    pub compute_cost: f64,
    /// Bytes to transfer.
    pub comm_cost: f64,
    /// Receiving host of a shuffle task.
    pub destination: Option<String>,
}

impl Task {
    pub fn init(compute_cost: f64) -> Self {
        Task {
            kind: TaskKind::Init,
            compute_cost,
            comm_cost: 0.,
            destination: None,
        }
    }

    pub fn map(compute_cost: f64) -> Self {
        Task {
            kind: TaskKind::Map,
            compute_cost,
            comm_cost: 0.,
            destination: None,
        }
    }

    pub fn shuffle(comm_cost: f64, destination: String) -> Self {
        Task {
            kind: TaskKind::Shuffle,
            compute_cost: 0.,
            comm_cost,
            destination: Some(destination),
        }
    }

    pub fn reduce(compute_cost: f64) -> Self {
        Task {
            kind: TaskKind::Reduce,
            compute_cost,
            comm_cost: 0.,
            destination: None,
        }
    }

    /// Time to execute the compute part of the task on a host with the given speed.
    pub fn execution_time(&self, speed: f64) -> f64 {
        self.compute_cost / speed
    }
}
