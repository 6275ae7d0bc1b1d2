use dslab_hadoop_cluster::host_state::HostState;

use super::ExecutorState;
use crate::gate::{ActivationGate, GateError};

/// Executes a single reduce task once the reduce phase starts.
#[derive(Debug)]
pub struct Reducer {
    name: String,
    gate: ActivationGate,
    state: ExecutorState,
}

impl Reducer {
    pub fn new(name: String) -> Self {
        Reducer {
            name,
            gate: ActivationGate::new(),
            state: ExecutorState::WaitingActivation,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Opens the gate and takes this reducer's task from the host queue.
    /// Returns the execution time of the task, `None` if the queue had nothing for it.
    pub fn activate(&mut self, host: &mut HostState) -> Result<Option<f64>, GateError> {
        self.gate.open(&self.name)?;
        self.state = ExecutorState::Running;
        Ok(host.pop_reduce_task().map(|task| task.execution_time(host.speed())))
    }

    pub fn finish(&mut self) {
        self.state = ExecutorState::Done;
    }
}
