//! Mapping from host names to host states.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use thiserror::Error;

use crate::{
    error::ConfigError,
    host_spec::{HostRole, HostSpec},
    host_state::HostState,
    job_config::JobConfig,
    platform::PlatformConfig,
};

pub type HostRef = Rc<RefCell<HostState>>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown host {0}")]
    NotFound(String),
}

/// Source of cluster topology and role assignment.
///
/// Hosts are registered during setup and never added or removed afterwards.
/// Workers are kept in ascending id order, which is the round-robin order of the work distributor.
#[derive(Default)]
pub struct HostRegistry {
    hosts: BTreeMap<String, HostRef>,
    master: Option<HostRef>,
    workers: Vec<HostRef>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a host. The master gets id 0, workers get ids 1, 2, ... in registration order.
    pub fn register(&mut self, spec: HostSpec) -> Result<HostRef, ConfigError> {
        if self.hosts.contains_key(&spec.name) {
            return Err(ConfigError::DuplicateHost(spec.name));
        }
        let id = match spec.role {
            HostRole::Master => {
                if self.master.is_some() {
                    return Err(ConfigError::MasterCount(2));
                }
                0
            }
            HostRole::Worker => self.workers.len() + 1,
        };
        let host = Rc::new(RefCell::new(HostState::new(
            id,
            spec.name.clone(),
            spec.role,
            spec.speed,
            spec.cores,
        )));
        match spec.role {
            HostRole::Master => self.master = Some(host.clone()),
            HostRole::Worker => self.workers.push(host.clone()),
        }
        self.hosts.insert(spec.name, host.clone());
        Ok(host)
    }

    /// Builds the registry from the declared roles and the platform capacities.
    ///
    /// Hosts are registered in platform order. Platform hosts without a declared role are skipped
    /// with a warning, declared hosts missing from the platform are an error.
    pub fn from_config(job: &JobConfig, platform: &PlatformConfig) -> Result<Self, ConfigError> {
        let mut registry = HostRegistry::new();
        for host in platform.hosts.iter() {
            match job.role_of(&host.name) {
                Some(role) => {
                    registry.register(HostSpec {
                        name: host.name.clone(),
                        role,
                        speed: host.speed,
                        cores: host.cores,
                    })?;
                }
                None => log::warn!("host {} has no role in the job config, excluding it", host.name),
            }
        }
        if let Some(missing) = job.hosts.iter().find(|host| !registry.hosts.contains_key(&host.name)) {
            return Err(ConfigError::UnknownHost(missing.name.clone()));
        }
        registry.validate()?;
        Ok(registry)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.master.is_none() {
            return Err(ConfigError::MasterCount(0));
        }
        if self.workers.is_empty() {
            return Err(ConfigError::NoWorkers);
        }
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<HostRef, RegistryError> {
        self.hosts
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn for_each_worker<F: FnMut(&HostRef)>(&self, f: F) {
        self.workers.iter().for_each(f);
    }

    /// Workers in ascending id order.
    pub fn workers(&self) -> impl Iterator<Item = &HostRef> {
        self.workers.iter()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn master(&self) -> Option<&HostRef> {
        self.master.as_ref()
    }

    /// All hosts ordered by name.
    pub fn hosts(&self) -> impl Iterator<Item = &HostRef> {
        self.hosts.values()
    }
}
