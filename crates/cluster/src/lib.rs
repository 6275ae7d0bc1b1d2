//! Cluster description for the Hadoop MapReduce model: job config, platform,
//! hosts with their work queues and the host registry.

pub mod error;
pub mod host_spec;
pub mod host_state;
pub mod job_config;
pub mod network;
pub mod platform;
pub mod registry;
pub mod task;
