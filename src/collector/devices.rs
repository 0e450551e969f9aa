// src/collector/devices.rs
//! Physical disk discovery and identity lookup.

use crate::collector::command::CommandRunner;
use crate::collector::smart::{UNKNOWN_STATUS, smartctl_succeeded};
use crate::error::ProbeResult;
use serde::Serialize;
use tracing::error;

/// A physical disk seen during one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Block device path (e.g., "/dev/sda")
    pub path: String,
    pub model: String,
    pub serial_number: String,
}

impl Device {
    /// Kernel name used as the row key by iostat ("sda").
    pub fn name(&self) -> &str {
        self.path.strip_prefix("/dev/").unwrap_or(&self.path)
    }
}

/// Function to parse `lsblk -dn -o NAME,TYPE` into device paths, keeping
/// only entries of type `disk`.
pub fn parse_disk_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            match (tokens.next(), tokens.next()) {
                (Some(name), Some("disk")) => Some(format!("/dev/{}", name)),
                _ => None,
            }
        })
        .collect()
}

/// Function to read model and serial from `smartctl -i` output. ATA drives
/// print `Device Model`, NVMe drives `Model Number`. Missing values are
/// reported as "Unknown".
pub fn parse_identity(output: &str) -> (String, String) {
    let mut model = UNKNOWN_STATUS.to_string();
    let mut serial = UNKNOWN_STATUS.to_string();

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "Device Model" | "Model Number" => model = value.trim().to_string(),
            "Serial Number" => serial = value.trim().to_string(),
            _ => {}
        }
    }

    (model, serial)
}

/// List the physical disks on this host.
pub async fn list_disks(runner: &dyn CommandRunner) -> ProbeResult<Vec<String>> {
    let output = runner.run("lsblk", &["-dn", "-o", "NAME,TYPE"]).await?;
    Ok(parse_disk_list(&output))
}

/// Resolve identity for one disk; lookup failures leave both fields "Unknown".
pub async fn describe_disk(runner: &dyn CommandRunner, path: &str) -> Device {
    let (model, serial_number) = match runner.run_accepting("smartctl", &["-i", path], smartctl_succeeded).await {
        Ok(output) => parse_identity(&output),
        Err(e) => {
            error!(device = path, category = e.category(), "failed to read disk identity: {}", e);
            (UNKNOWN_STATUS.to_string(), UNKNOWN_STATUS.to_string())
        }
    };

    Device {
        path: path.to_string(),
        model,
        serial_number,
    }
}

/// Enumerate disks and resolve the identity of each. An enumeration failure
/// yields an empty list.
pub async fn enumerate_devices(runner: &dyn CommandRunner) -> Vec<Device> {
    let paths = match list_disks(runner).await {
        Ok(paths) => paths,
        Err(e) => {
            error!(category = e.category(), "failed to list disks: {}", e);
            return Vec::new();
        }
    };

    let mut devices = Vec::with_capacity(paths.len());
    for path in paths {
        devices.push(describe_disk(runner, &path).await);
    }
    devices
}
