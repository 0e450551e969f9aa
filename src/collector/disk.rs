// src/collector/disk.rs
//! Per-disk performance from iostat.

use crate::collector::command::CommandRunner;
use crate::collector::table::ColumnTable;
use crate::error::ProbeResult;
use serde::{Deserialize, Serialize};

/// Unit used when reporting read/write throughput.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum ThroughputUnit {
    /// Kilobytes per second, as iostat reports it
    #[default]
    #[serde(rename = "KB/s", alias = "kb")]
    #[value(name = "kb")]
    KiloBytes,
    #[serde(rename = "MB/s", alias = "mb")]
    #[value(name = "mb")]
    MegaBytes,
    #[serde(rename = "B/s", alias = "b")]
    #[value(name = "b")]
    Bytes,
}

impl ThroughputUnit {
    /// Convert a kB/s figure into this unit.
    pub fn from_kilobytes(self, kb: f64) -> f64 {
        match self {
            ThroughputUnit::KiloBytes => kb,
            ThroughputUnit::MegaBytes => kb / 1024.0,
            ThroughputUnit::Bytes => kb * 1024.0,
        }
    }
}

/// Maximum and mean `%util` over a set of devices.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Utilization {
    pub max: f64,
    pub avg: f64,
}

/// One `iostat -x` report.
#[derive(Debug, Clone)]
pub struct IostatExtended {
    table: ColumnTable,
}

impl IostatExtended {
    pub fn parse(text: &str) -> ProbeResult<Self> {
        let table = ColumnTable::locate(text, "Device", |line| line.starts_with("Device"))?;
        Ok(Self { table })
    }

    /// Average request queue length (`aqu-sz`, `avgqu-sz` on older sysstat).
    pub fn io_queue_size(&self, key: &str) -> ProbeResult<f64> {
        self.table.float(key, &["aqu-sz", "avgqu-sz"])
    }

    pub fn read_qps(&self, key: &str) -> ProbeResult<f64> {
        self.table.float(key, &["r/s"])
    }

    pub fn write_qps(&self, key: &str) -> ProbeResult<f64> {
        self.table.float(key, &["w/s"])
    }

    /// Mean read wait in milliseconds.
    pub fn read_queue_time(&self, key: &str) -> ProbeResult<f64> {
        self.table.float(key, &["r_await"])
    }

    /// Mean write wait in milliseconds.
    pub fn write_queue_time(&self, key: &str) -> ProbeResult<f64> {
        self.table.float(key, &["w_await"])
    }

    pub fn read_throughput(&self, key: &str, unit: ThroughputUnit) -> ProbeResult<f64> {
        self.table
            .float(key, &["rkB/s"])
            .map(|kb| unit.from_kilobytes(kb))
    }

    pub fn write_throughput(&self, key: &str, unit: ThroughputUnit) -> ProbeResult<f64> {
        self.table
            .float(key, &["wkB/s"])
            .map(|kb| unit.from_kilobytes(kb))
    }

    /// Utilization over `keys`. Keys without a row do not count; with no
    /// samples at all both figures are zero.
    pub fn utilization(&self, keys: &[&str]) -> ProbeResult<Utilization> {
        let samples = self.table.floats(keys, "%util")?;
        if samples.is_empty() {
            return Ok(Utilization::default());
        }

        let max = samples.iter().copied().fold(f64::MIN, f64::max);
        let avg = samples.iter().sum::<f64>() / samples.len() as f64;
        Ok(Utilization { max, avg })
    }
}

/// Cumulative kB read and written since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiskTotals {
    pub read_kb: f64,
    pub write_kb: f64,
}

/// Function to sum `kB_read` / `kB_wrtn` of `iostat -k` over `keys`.
pub fn parse_totals(text: &str, keys: &[&str]) -> ProbeResult<DiskTotals> {
    let table = ColumnTable::locate(text, "Device", |line| line.starts_with("Device"))?;

    Ok(DiskTotals {
        read_kb: table.floats(keys, "kB_read")?.iter().sum(),
        write_kb: table.floats(keys, "kB_wrtn")?.iter().sum(),
    })
}

/// Take one extended iostat sample.
pub async fn collect_extended(runner: &dyn CommandRunner) -> ProbeResult<IostatExtended> {
    let output = runner.run("iostat", &["-x", "1", "1"]).await?;
    IostatExtended::parse(&output)
}

/// Read cumulative transfer totals for `keys`.
pub async fn collect_totals(runner: &dyn CommandRunner, keys: &[&str]) -> ProbeResult<DiskTotals> {
    let output = runner.run("iostat", &["-k"]).await?;
    parse_totals(&output, keys)
}
