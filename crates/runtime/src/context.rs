//! State shared by the coordinator and all worker hosts of one simulated job.

use std::cell::{Cell, Ref, RefCell, RefMut};

use dslab_hadoop_cluster::registry::HostRegistry;

use crate::{params::JobParams, run_stats::RunStats, work_distributor::WorkDistributor, worker_agent::WorkerAgent};

pub struct JobContext {
    registry: HostRegistry,
    params: JobParams,
    shuffle_started: Cell<bool>,
    stats: RefCell<RunStats>,
}

impl JobContext {
    pub fn new(registry: HostRegistry, params: JobParams) -> Self {
        JobContext {
            registry,
            params,
            shuffle_started: Cell::new(false),
            stats: RefCell::new(RunStats::new()),
        }
    }

    pub fn registry(&self) -> &HostRegistry {
        &self.registry
    }

    pub fn params(&self) -> &JobParams {
        &self.params
    }

    pub fn distributor(&self) -> WorkDistributor<'_> {
        WorkDistributor::new(&self.registry, &self.params)
    }

    pub fn worker_agent(&self) -> WorkerAgent<'_> {
        WorkerAgent::new(&self.params, self.registry.worker_count())
    }

    /// Returns `true` for the first caller in the cluster and `false` afterwards.
    pub fn claim_shuffle_start(&self) -> bool {
        !self.shuffle_started.replace(true)
    }

    pub fn stats(&self) -> Ref<'_, RunStats> {
        self.stats.borrow()
    }

    pub fn stats_mut(&self) -> RefMut<'_, RunStats> {
        self.stats.borrow_mut()
    }
}
