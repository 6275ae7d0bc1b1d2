#![doc = include_str!("../../../README.md")]

pub mod cluster_simulation;
pub mod context;
pub mod coordinator;
pub mod events;
pub mod executors;
pub mod experiment;
pub mod gate;
pub mod params;
pub mod phase;
pub mod reference;
pub mod run_stats;
pub mod trace;
pub mod work_distributor;
pub mod worker;
pub mod worker_agent;
