//! Platform description: host capacities and network topology.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NetworkConfig {
    /// All hosts are connected to a single switch.
    Star {
        bandwidth: f64,
        latency: f64,
        internal_bandwidth: f64,
    },
    /// Hosts are connected to rack switches which are connected to a root switch.
    Tree {
        bandwidth: f64,
        uplink_bandwidth: f64,
        latency: f64,
        internal_bandwidth: f64,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HostConfig {
    pub name: String,
    pub speed: f64,
    pub cores: u32,
    #[serde(default)]
    pub rack: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub network: NetworkConfig,
    pub hosts: Vec<HostConfig>,
}

impl PlatformConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let platform: PlatformConfig = serde_yaml::from_str(text)?;
        platform.validate()?;
        Ok(platform)
    }

    /// Read [PlatformConfig] from YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::io(path.as_ref(), e))?;
        Self::from_yaml_str(&text)
    }

    pub fn host(&self, name: &str) -> Option<&HostConfig> {
        self.hosts.iter().find(|host| host.name == name)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for host in self.hosts.iter() {
            if host.cores == 0 {
                return Err(ConfigError::invalid_value(
                    format!("hosts.{}.cores", host.name),
                    "must be positive",
                ));
            }
            if host.speed.is_nan() || host.speed <= 0. {
                return Err(ConfigError::invalid_value(
                    format!("hosts.{}.speed", host.name),
                    "must be positive",
                ));
            }
        }
        let (bandwidth, internal_bandwidth) = match self.network {
            NetworkConfig::Star {
                bandwidth,
                internal_bandwidth,
                ..
            } => (bandwidth, internal_bandwidth),
            NetworkConfig::Tree {
                bandwidth,
                uplink_bandwidth,
                internal_bandwidth,
                ..
            } => (bandwidth.min(uplink_bandwidth), internal_bandwidth),
        };
        if bandwidth.is_nan() || bandwidth <= 0. || internal_bandwidth.is_nan() || internal_bandwidth <= 0. {
            return Err(ConfigError::invalid_value("network", "bandwidth must be positive"));
        }
        Ok(())
    }
}
