//! Job config in the `key value` line format.
//!
//! ```text
//! master host0
//! worker host1-host4
//! mappers 0
//! reducers 8
//! input_size_in_mb 512
//! hdfs_chunk_size_in_mb 64
//! platform platform.yaml
//! ```

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use crate::{
    error::ConfigError,
    host_spec::{expand_hosts, HostDeclaration, HostRole},
};

pub const BYTES_PER_MB: u64 = 1_048_576;

/// Typed job config, validated once after parsing.
#[derive(Clone, Debug)]
pub struct JobConfig {
    /// Declared hosts in declaration order.
    pub hosts: Vec<HostDeclaration>,
    /// Informational total, the actual number of mappers is derived from host cores.
    pub mappers: u64,
    /// Total number of reducers, apportioned across workers.
    pub reducers: u64,
    pub input_size_mb: u64,
    pub chunk_size_mb: u64,
    /// Platform description path, if given in the config.
    pub platform: Option<PathBuf>,
}

fn parse_number(line: usize, key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        line,
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl JobConfig {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut hosts = Vec::new();
        let mut mappers = None;
        let mut reducers = None;
        let mut input_size_mb = None;
        let mut chunk_size_mb = None;
        let mut platform = None;

        for (index, raw_line) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw_line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut tokens = trimmed.split_whitespace();
            let (Some(key), Some(value), None) = (tokens.next(), tokens.next(), tokens.next()) else {
                return Err(ConfigError::MalformedLine {
                    line,
                    text: raw_line.to_string(),
                });
            };
            match key {
                "master" | "worker" => {
                    let role = if key == "master" {
                        HostRole::Master
                    } else {
                        HostRole::Worker
                    };
                    for name in expand_hosts(value)? {
                        hosts.push(HostDeclaration { name, role });
                    }
                }
                "mappers" => mappers = Some(parse_number(line, key, value)?),
                "reducers" => reducers = Some(parse_number(line, key, value)?),
                "input_size_in_mb" => input_size_mb = Some(parse_number(line, key, value)?),
                "hdfs_chunk_size_in_mb" => chunk_size_mb = Some(parse_number(line, key, value)?),
                "platform" => platform = Some(PathBuf::from(value)),
                _ => log::warn!("ignoring unknown config key {:?} on line {}", key, line),
            }
        }

        let config = JobConfig {
            hosts,
            mappers: mappers.unwrap_or(0),
            reducers: reducers.ok_or(ConfigError::MissingKey("reducers"))?,
            input_size_mb: input_size_mb.ok_or(ConfigError::MissingKey("input_size_in_mb"))?,
            chunk_size_mb: chunk_size_mb.ok_or(ConfigError::MissingKey("hdfs_chunk_size_in_mb"))?,
            platform,
        };
        config.validate()?;
        Ok(config)
    }

    /// Read [JobConfig] from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::io(path.as_ref(), e))?;
        Self::parse(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("reducers", self.reducers),
            ("input_size_in_mb", self.input_size_mb),
            ("hdfs_chunk_size_in_mb", self.chunk_size_mb),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid_value(key, "must be positive"));
            }
        }

        let mut seen = BTreeSet::new();
        for host in self.hosts.iter() {
            if !seen.insert(host.name.as_str()) {
                return Err(ConfigError::DuplicateHost(host.name.clone()));
            }
        }

        let masters = self.hosts.iter().filter(|host| host.role == HostRole::Master).count();
        if masters != 1 {
            return Err(ConfigError::MasterCount(masters));
        }
        if self.workers().next().is_none() {
            return Err(ConfigError::NoWorkers);
        }
        Ok(())
    }

    /// Platform description path: the explicit one if given, else the one from the config.
    pub fn platform_path(&self, explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        explicit
            .or_else(|| self.platform.clone())
            .ok_or(ConfigError::MissingKey("platform"))
    }

    pub fn master(&self) -> &str {
        self.hosts
            .iter()
            .find(|host| host.role == HostRole::Master)
            .map(|host| host.name.as_str())
            .unwrap_or_default()
    }

    pub fn workers(&self) -> impl Iterator<Item = &str> {
        self.hosts
            .iter()
            .filter(|host| host.role == HostRole::Worker)
            .map(|host| host.name.as_str())
    }

    pub fn role_of(&self, host_name: &str) -> Option<HostRole> {
        self.hosts
            .iter()
            .find(|host| host.name == host_name)
            .map(|host| host.role)
    }

    pub fn input_size_bytes(&self) -> u64 {
        self.input_size_mb * BYTES_PER_MB
    }

    pub fn chunk_size_bytes(&self) -> u64 {
        self.chunk_size_mb * BYTES_PER_MB
    }

    /// Number of HDFS chunks, each of which becomes one map task.
    pub fn map_task_count(&self) -> u64 {
        self.input_size_bytes().div_ceil(self.chunk_size_bytes())
    }
}
