//! Events exchanged between the coordinator and worker hosts.

use dslab_core::Id;
use serde::Serialize;

/// Starts the job, sent to the coordinator.
#[derive(Clone, Serialize)]
pub struct Start {}

/// Coordinator asks a worker host to launch its executors.
#[derive(Clone, Serialize)]
pub struct LaunchExecutors {}

/// Coordinator releases all mappers of a worker host.
#[derive(Clone, Serialize)]
pub struct ActivateMappers {}

/// Coordinator releases all reducers of a worker host.
#[derive(Clone, Serialize)]
pub struct ActivateReducers {}

/// A worker host finished its initialization task.
#[derive(Clone, Serialize)]
pub struct InitCompleted {
    pub host: String,
    pub mappers: usize,
    pub shufflers: usize,
    pub reducers: usize,
}

/// First shuffle transfer in the cluster has started.
#[derive(Clone, Serialize)]
pub struct ShuffleStarted {
    pub sender: String,
}

#[derive(Clone, Serialize)]
pub struct MapperExited {
    pub mapper: String,
}

#[derive(Clone, Serialize)]
pub struct ShuffleSenderExited {
    pub sender: String,
}

#[derive(Clone, Serialize)]
pub struct ReducerExited {
    pub reducer: String,
}

// Events a worker host sends to itself.

#[derive(Clone, Serialize)]
pub(crate) struct InitTaskExecuted {}

#[derive(Clone, Serialize)]
pub(crate) struct MapTaskExecuted {
    pub mapper: usize,
    pub elapsed: f64,
}

#[derive(Clone, Serialize)]
pub(crate) struct ShufflePoll {
    pub sender: usize,
}

#[derive(Clone, Serialize)]
pub(crate) struct ReduceTaskExecuted {
    pub reducer: usize,
    pub elapsed: f64,
}

// Events between worker hosts.

/// Spawns a receiver on the destination host for one network transfer.
#[derive(Clone, Serialize)]
pub struct SpawnShuffleReceiver {
    pub receiver: String,
    pub transfer_id: usize,
    pub sender_host: Id,
    pub sender: usize,
}

/// The receiver consumed the transfer of `sender`.
#[derive(Clone, Serialize)]
pub struct ShuffleDelivered {
    pub receiver: String,
    pub sender: usize,
}
