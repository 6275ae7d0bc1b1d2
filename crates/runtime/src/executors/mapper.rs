use dslab_hadoop_cluster::host_state::HostState;

use super::ExecutorState;
use crate::gate::{ActivationGate, GateError};

#[derive(Debug, PartialEq)]
pub enum MapperStep {
    /// The gate is still closed or the mapper has already exited.
    Blocked,
    /// A map task was dequeued and takes `elapsed` seconds on this host.
    Execute { elapsed: f64 },
    /// The map queue is drained, the mapper is done.
    Exit,
}

/// Drains the host's map queue once activated.
#[derive(Debug)]
pub struct Mapper {
    name: String,
    gate: ActivationGate,
    state: ExecutorState,
    completed_tasks: u64,
}

impl Mapper {
    pub fn new(name: String) -> Self {
        Mapper {
            name,
            gate: ActivationGate::new(),
            state: ExecutorState::WaitingActivation,
            completed_tasks: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn completed_tasks(&self) -> u64 {
        self.completed_tasks
    }

    pub fn activate(&mut self) -> Result<(), GateError> {
        self.gate.open(&self.name)?;
        self.state = ExecutorState::Running;
        Ok(())
    }

    /// Takes the next map task from the host queue. When the queue is empty the mapper
    /// finishes and the host's active mapper count is decremented.
    pub fn next_step(&mut self, host: &mut HostState) -> MapperStep {
        if self.state != ExecutorState::Running {
            return MapperStep::Blocked;
        }
        match host.pop_map_task() {
            Some(task) => MapperStep::Execute {
                elapsed: task.execution_time(host.speed()),
            },
            None => {
                self.state = ExecutorState::Done;
                host.mapper_exited();
                MapperStep::Exit
            }
        }
    }

    pub fn task_completed(&mut self) {
        self.completed_tasks += 1;
    }
}
