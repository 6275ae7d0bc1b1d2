//! Map task assignment and shuffle fan-out.

use dslab_hadoop_cluster::{
    registry::{HostRef, HostRegistry},
    task::Task,
};

use crate::params::JobParams;

pub struct WorkDistributor<'a> {
    registry: &'a HostRegistry,
    params: &'a JobParams,
}

impl<'a> WorkDistributor<'a> {
    pub fn new(registry: &'a HostRegistry, params: &'a JobParams) -> Self {
        WorkDistributor { registry, params }
    }

    /// Enqueues one map task per HDFS chunk, walking workers round-robin in ascending id order.
    ///
    /// Returns the number of created map tasks. Per-worker counts differ by at most one.
    pub fn distribute_chunks(&self) -> u64 {
        let mut chunks_left = self.params.map_task_count();
        if self.registry.worker_count() == 0 {
            return 0;
        }
        let mut created = 0;
        while chunks_left > 0 {
            for host in self.registry.workers() {
                if chunks_left == 0 {
                    break;
                }
                let mut host = host.borrow_mut();
                let cost = self.params.map_cost(host.speed());
                host.push_map_task(Task::map(cost));
                chunks_left -= 1;
                created += 1;
            }
        }
        created
    }

    /// Enqueues the shuffle transfers produced by one completed map task on `source`:
    /// one task per reducer hosted anywhere in the cluster, addressed to the reducer's host.
    ///
    /// Returns the fan-out size.
    pub fn partition(&self, source: &HostRef, comm_cost: f64) -> usize {
        // The source host is a worker too, so collect first and mutate afterwards.
        let mut tasks = Vec::new();
        for host in self.registry.workers() {
            let host = host.borrow();
            for _ in host.reducers() {
                tasks.push(Task::shuffle(comm_cost, host.name().to_string()));
            }
        }
        let fan_out = tasks.len();
        source.borrow_mut().push_shuffle_tasks(tasks);
        fan_out
    }
}

/// Number of reducers hosted by the worker with the given id (ids start from 1).
///
/// Reducers are split evenly, the remainder goes to the lowest ids.
pub fn reducer_share(reducers: u64, worker_count: usize, host_id: usize) -> u64 {
    if worker_count == 0 {
        return 0;
    }
    let worker_count = worker_count as u64;
    let base = reducers / worker_count;
    if (host_id as u64) <= reducers % worker_count {
        base + 1
    } else {
        base
    }
}
