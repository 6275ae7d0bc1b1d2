//! Per-host launcher of executors.

use dslab_hadoop_cluster::{host_state::HostState, task::Task};
use serde::Serialize;

use crate::{
    executors::{mapper::Mapper, reducer::Reducer, shuffle::ShuffleSender},
    params::JobParams,
    work_distributor::reducer_share,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExecutorCounts {
    pub mappers: usize,
    pub shufflers: usize,
    pub reducers: usize,
}

pub struct LaunchedExecutors {
    pub mappers: Vec<Mapper>,
    pub senders: Vec<ShuffleSender>,
    pub reducers: Vec<Reducer>,
}

impl LaunchedExecutors {
    pub fn counts(&self) -> ExecutorCounts {
        ExecutorCounts {
            mappers: self.mappers.len(),
            shufflers: self.senders.len(),
            reducers: self.reducers.len(),
        }
    }
}

/// Sizes and spawns the executors of one worker host during initialization.
pub struct WorkerAgent<'a> {
    params: &'a JobParams,
    worker_count: usize,
}

impl<'a> WorkerAgent<'a> {
    pub fn new(params: &'a JobParams, worker_count: usize) -> Self {
        WorkerAgent { params, worker_count }
    }

    /// Creates one mapper per core, this host's share of reducers and a fixed number of
    /// shuffle senders per reducer, recording all of them on the host.
    pub fn launch(&self, host: &mut HostState) -> LaunchedExecutors {
        let mapper_slots = host.cores() as usize;
        let reducers = reducer_share(self.params.reducers, self.worker_count, host.id()) as usize;
        let shufflers = self.params.cost_model.shufflers_per_reducer as usize * reducers;

        let mut launched = LaunchedExecutors {
            mappers: Vec::with_capacity(mapper_slots),
            senders: Vec::with_capacity(shufflers),
            reducers: Vec::with_capacity(reducers),
        };
        for i in 0..mapper_slots {
            let name = format!("{}-mapper-{}", host.name(), i);
            host.add_mapper(name.clone());
            launched.mappers.push(Mapper::new(name));
        }
        for i in 0..shufflers {
            let name = format!("{}-sender-{}", host.name(), i);
            host.add_shuffle_sender(name.clone());
            launched.senders.push(ShuffleSender::new(name));
        }
        for i in 0..reducers {
            let name = format!("{}-reducer-{}", host.name(), i);
            host.add_reducer(name.clone());
            launched.reducers.push(Reducer::new(name));
        }
        launched
    }

    /// Task modelling the overhead of spawning the executors.
    pub fn init_task(&self, host: &HostState) -> Task {
        Task::init(self.params.init_cost(host.speed()))
    }

    /// Enqueues one reduce task per reducer on the host.
    pub fn create_reduce_tasks(&self, host: &mut HostState) -> usize {
        let count = host.reducers().len();
        let cost = self.params.reduce_cost(host.speed());
        for _ in 0..count {
            host.push_reduce_task(Task::reduce(cost));
        }
        count
    }
}
