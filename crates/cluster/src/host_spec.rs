//! Host declarations from the job config and host range expansion.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostRole {
    Master,
    Worker,
}

/// A single host named by a `master` or `worker` line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostDeclaration {
    pub name: String,
    pub role: HostRole,
}

/// Everything the registry needs to register a host: its declaration plus the
/// capacity reported by the platform.
#[derive(Clone, Debug)]
pub struct HostSpec {
    pub name: String,
    pub role: HostRole,
    /// Compute speed in flops per second.
    pub speed: f64,
    /// Number of cores, which is also the number of map slots.
    pub cores: u32,
}

fn split_numbered(name: &str) -> Option<(&str, u64)> {
    let digits_start = name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (prefix, digits) = name.split_at(digits_start);
    if prefix.is_empty() || digits.is_empty() {
        return None;
    }
    digits.parse().ok().map(|number| (prefix, number))
}

/// Expands a host value into host names.
///
/// A plain name yields itself. A range `node1-node5` yields `node1`, `node2`, ..., `node5`,
/// both ends inclusive. Both ends must share the same alphabetic prefix.
pub fn expand_hosts(value: &str) -> Result<Vec<String>, ConfigError> {
    let Some((first, last)) = value.split_once('-') else {
        return Ok(vec![value.to_string()]);
    };
    let invalid = || ConfigError::InvalidHostRange(value.to_string());
    let (first_prefix, first_number) = split_numbered(first).ok_or_else(invalid)?;
    let (last_prefix, last_number) = split_numbered(last).ok_or_else(invalid)?;
    if first_prefix != last_prefix || last_number < first_number {
        return Err(invalid());
    }
    Ok((first_number..=last_number)
        .map(|number| format!("{}{}", first_prefix, number))
        .collect())
}
