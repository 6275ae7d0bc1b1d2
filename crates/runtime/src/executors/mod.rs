//! Executors living on worker hosts. They hold the per-executor state machine,
//! while the worker host component drives them through simulation events.

pub mod mapper;
pub mod reducer;
pub mod shuffle;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ExecutorState {
    WaitingActivation,
    Running,
    Done,
}
