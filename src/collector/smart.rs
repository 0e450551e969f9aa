// src/collector/smart.rs
//! ATA SMART collection via smartctl.

use crate::collector::command::CommandRunner;
use crate::error::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Phrase smartctl prints in front of the overall health verdict.
pub const HEALTH_MARKER: &str = "SMART overall-health self-assessment test result";

/// Status reported whenever the health verdict cannot be determined.
pub const UNKNOWN_STATUS: &str = "Unknown";

/// One extracted SMART attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SmartAttribute {
    pub id: u32,
    /// Vendor-normalized value (the `VALUE` column).
    pub normalized: i64,
    /// Leading integer of the raw value.
    pub raw: i64,
}

/// The attribute ids to extract, each with a human label. Iteration is
/// ascending by id, which is also the order of the SMART columns in a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartRegistry {
    attributes: BTreeMap<u32, String>,
}

impl SmartRegistry {
    pub fn new(attributes: BTreeMap<u32, String>) -> Self {
        Self { attributes }
    }

    pub fn contains(&self, id: u32) -> bool {
        self.attributes.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.attributes.keys().copied()
    }

    pub fn label(&self, id: u32) -> Option<&str> {
        self.attributes.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl Default for SmartRegistry {
    fn default() -> Self {
        let attributes = [
            (1, "Read_Error_Rate"),
            (3, "Spin-Up_Time"),
            (4, "Start/Stop_Count"),
            (5, "Reallocated_Sectors_Count"),
            (7, "Seek_Error_Rate"),
            (9, "Power-On_Hours"),
            (10, "Spin_Retry_Count"),
            (12, "Power_Cycle_Count"),
            (187, "Reported_UNC_Errors"),
            (188, "Command_Timeout"),
            (191, "G-sense_error_rate"),
            (192, "Power-off_Retract_Count"),
            (193, "Load/Unload_Cycle_Count"),
            (194, "Temperature_Celsius"),
            (198, "Uncorrectable_Sector_Count"),
            (199, "UltraDMA_CRC_Error_Count"),
        ]
        .into_iter()
        .map(|(id, label)| (id, label.to_string()))
        .collect();

        Self { attributes }
    }
}

// Subset of `smartctl -A -j` output that we read.
#[derive(Debug, Deserialize)]
struct SmartctlReport {
    ata_smart_attributes: Option<AtaSmartAttributes>,
}

#[derive(Debug, Deserialize)]
struct AtaSmartAttributes {
    #[serde(default)]
    table: Vec<AttributeEntry>,
}

#[derive(Debug, Deserialize)]
struct AttributeEntry {
    id: Option<u32>,
    #[serde(default)]
    value: i64,
    raw: Option<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    string: Option<String>,
    value: Option<serde_json::Value>,
}

impl RawEntry {
    fn text(&self) -> String {
        if let Some(s) = &self.string {
            return s.clone();
        }
        match &self.value {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => "0".to_string(),
        }
    }
}

/// Keep only the leading run of digits of a raw SMART value,
/// `"1620 (176 116 0)"` → `1620`. No leading digits → `0`.
pub fn leading_integer(raw: &str) -> i64 {
    let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Function to extract the registered attributes from `smartctl -A -j` JSON.
/// Output without an ATA attribute table (NVMe, USB bridges) yields an
/// empty list.
pub fn parse_smart_attributes(json: &str, registry: &SmartRegistry) -> ProbeResult<Vec<SmartAttribute>> {
    let report: SmartctlReport = serde_json::from_str(json)?;

    let Some(section) = report.ata_smart_attributes else {
        return Ok(Vec::new());
    };

    Ok(section
        .table
        .iter()
        .filter_map(|entry| {
            let id = entry.id.filter(|id| registry.contains(*id))?;
            let raw = entry
                .raw
                .as_ref()
                .map(RawEntry::text)
                .unwrap_or_else(|| "0".to_string());

            Some(SmartAttribute {
                id,
                normalized: entry.value,
                raw: leading_integer(&raw),
            })
        })
        .collect())
}

/// Function to pull the verdict after the colon on the health line.
pub fn parse_health_status(output: &str) -> ProbeResult<String> {
    output
        .lines()
        .find(|line| line.contains(HEALTH_MARKER))
        .and_then(|line| line.rsplit(':').next())
        .map(|status| status.trim().to_string())
        .filter(|status| !status.is_empty())
        .ok_or_else(|| ProbeError::MarkerNotFound(HEALTH_MARKER.to_string()))
}

/// Whether a smartctl exit status still carries usable output. Bit 0 means
/// the command line did not parse and bit 1 that the device could not be
/// opened; the higher bits report findings about the disk itself (a failing
/// health check, logged errors) alongside normal output.
pub fn smartctl_succeeded(code: i32) -> bool {
    code & 0b11 == 0
}

/// Query the attribute table of one device.
pub async fn collect_smart_attributes(
    runner: &dyn CommandRunner,
    device_path: &str,
    registry: &SmartRegistry,
) -> ProbeResult<Vec<SmartAttribute>> {
    let output = runner
        .run_accepting("smartctl", &["-A", "-j", device_path], smartctl_succeeded)
        .await?;
    parse_smart_attributes(&output, registry)
}

/// Query the overall health verdict of one device ("PASSED", "FAILED", ...).
pub async fn collect_health_status(runner: &dyn CommandRunner, device_path: &str) -> ProbeResult<String> {
    let output = runner
        .run_accepting("smartctl", &["-H", device_path], smartctl_succeeded)
        .await?;
    parse_health_status(&output)
}
