// src/collector/host.rs
//! Host-wide counters: netstat, vmstat, free, mpstat and ifstat.
//!
//! Each collector runs its tool afresh, so every call is an independent
//! point-in-time snapshot.

use crate::collector::command::CommandRunner;
use crate::collector::scanner::{Policy, Rule, scan};
use crate::collector::table::{ColumnTable, labeled_row, paired_columns, parse_decimal};
use crate::error::{ProbeError, ProbeResult};
use std::collections::HashMap;

/// Rules applied to `netstat -s`.
pub const NETSTAT_RULES: [Rule; 6] = [
    Rule::leading("tcp_outsegs", "segments sent out", Policy::First),
    Rule::leading("udp_outdatagrams", "datagrams sent", Policy::Last),
    Rule::leading("udp_indatagrams", "datagrams received", Policy::Last),
    Rule::leading("net_pps_receive", "packets received", Policy::Last),
    Rule::leading("net_pps_transmit", "packets sent", Policy::Last),
    Rule::leading("tcp_currestab", "connections established", Policy::First),
];

/// Labels `free` uses for its memory summary row.
pub const MEMORY_ROW_LABELS: [&str; 2] = ["Mem:", "Память:"];

/// Counters scanned out of one `netstat -s` run.
#[derive(Debug, Clone, Default)]
pub struct NetCounters {
    values: HashMap<&'static str, i64>,
}

impl NetCounters {
    pub fn parse(text: &str) -> Self {
        Self {
            values: scan(text, &NETSTAT_RULES),
        }
    }

    /// Value of a counter named after its record field (`"tcp_outsegs"`).
    pub fn get(&self, field: &str) -> ProbeResult<i64> {
        self.values.get(field).copied().ok_or_else(|| {
            let marker = NETSTAT_RULES
                .iter()
                .find(|rule| rule.field == field)
                .map_or(field, |rule| rule.marker);
            ProbeError::MarkerNotFound(marker.to_string())
        })
    }
}

/// Swap activity from vmstat, pages per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageActivity {
    pub page_in: i64,
    pub page_out: i64,
}

/// Memory figures from `free -k`, in kB.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemorySummary {
    pub total_kb: f64,
    pub used_kb: f64,
    pub free_kb: f64,
    /// total − used
    pub reserved_kb: f64,
}

/// Per-interface rate from ifstat, KB/s.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InterfaceRate {
    pub receive_kbps: f64,
    pub transmit_kbps: f64,
}

/// Function to read `si`/`so` from vmstat: the column header is the line
/// after the `procs` banner, the sample two lines after it.
pub fn parse_page_activity(text: &str) -> ProbeResult<PageActivity> {
    let table = ColumnTable::at_offsets(text, "procs", |line| line.starts_with("procs"), 1, 2)?;
    let row = table
        .rows()
        .first()
        .ok_or_else(|| ProbeError::MarkerNotFound("procs data".to_string()))?;

    let integer = |column: &str| -> ProbeResult<i64> {
        let token = table.cell(row, &[column])?;
        token.parse().map_err(|_| ProbeError::BadToken {
            field: column.to_string(),
            token: token.to_string(),
        })
    };

    Ok(PageActivity {
        page_in: integer("si")?,
        page_out: integer("so")?,
    })
}

/// Function to read the memory summary row of `free -k`. Columns are
/// positional: total, used, free.
pub fn parse_memory(text: &str) -> ProbeResult<MemorySummary> {
    let row = labeled_row(text, &MEMORY_ROW_LABELS)?;
    let at = |i: usize| -> ProbeResult<f64> {
        row.get(i)
            .map(|token| parse_decimal(token))
            .ok_or_else(|| ProbeError::ShortRow {
                key: row[0].to_string(),
                column: i.to_string(),
            })
    };

    let total_kb = at(1)?;
    let used_kb = at(2)?;
    let free_kb = at(3)?;

    Ok(MemorySummary {
        total_kb,
        used_kb,
        free_kb,
        reserved_kb: total_kb - used_kb,
    })
}

/// Function to derive kernel-side CPU load, `100 − %idle` of the `all` row.
pub fn parse_cpu_kernel(text: &str) -> ProbeResult<f64> {
    let table = ColumnTable::locate(text, "CPU %idle", |line| {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        tokens.contains(&"CPU") && tokens.contains(&"%idle")
    })?;
    let row = table.row_containing("all")?;
    let idle = parse_decimal(table.cell(row, &["%idle"])?);

    Ok(100.0 - idle)
}

/// Function to read one interface from `ifstat`: names on line 0, the
/// sample on line 2, two columns (in, out) per interface.
pub fn parse_interface_rate(text: &str, interface: &str) -> ProbeResult<InterfaceRate> {
    let (rx, tx) = paired_columns(text, 0, 2, interface)?;

    Ok(InterfaceRate {
        receive_kbps: parse_decimal(rx),
        transmit_kbps: parse_decimal(tx),
    })
}

pub async fn collect_net_counters(runner: &dyn CommandRunner) -> ProbeResult<NetCounters> {
    let output = runner.run("netstat", &["-s"]).await?;
    Ok(NetCounters::parse(&output))
}

pub async fn collect_page_activity(runner: &dyn CommandRunner) -> ProbeResult<PageActivity> {
    let output = runner.run("vmstat", &["1", "2"]).await?;
    parse_page_activity(&output)
}

pub async fn collect_memory(runner: &dyn CommandRunner) -> ProbeResult<MemorySummary> {
    let output = runner.run("free", &["-k"]).await?;
    parse_memory(&output)
}

pub async fn collect_cpu_kernel(runner: &dyn CommandRunner) -> ProbeResult<f64> {
    let output = runner.run("mpstat", &["1", "1"]).await?;
    parse_cpu_kernel(&output)
}

pub async fn collect_interface_rate(runner: &dyn CommandRunner, interface: &str) -> ProbeResult<InterfaceRate> {
    let output = runner.run("ifstat", &["1", "1"]).await?;
    parse_interface_rate(&output, interface)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETSTAT: &str = "\
Ip:
    Forwarding: 1
    10928374 total packets received
    0 forwarded
Tcp:
    4021 active connection openings
    37 connections established
    9812734 segments received
    8712634 segments sent out
Udp:
    55120 packets received
    51002 packets sent
UdpLite:
";

    const VMSTAT: &str = "\
procs -----------memory---------- ---swap-- -----io---- -system-- ------cpu-----
 r  b   swpd   free   buff  cache   si   so    bi    bo   in   cs us sy id wa st
 0  0  10240 812344  10240 204800   12   34    12    30  100  200  2  1 97  0  0
 0  0  10240 812000  10240 204800    0    0     0     0   90  180  1  1 98  0  0
";

    const MPSTAT: &str = "\
Linux 6.1.0-18-amd64 (storage01) \t10/19/2026 \t_x86_64_\t(16 CPU)

12:00:01 PM  CPU    %usr   %nice    %sys %iowait    %irq   %soft  %steal  %guest  %gnice   %idle
12:00:02 PM  all    1,25    0,00    0,75    0,00    0,00    0,12    0,00    0,00    0,00   97,88
Average:     all    1,25    0,00    0,75    0,00    0,00    0,12    0,00    0,00    0,00   97,88
";

    #[test]
    fn test_net_counters() {
        let counters = NetCounters::parse(NETSTAT);

        assert_eq!(counters.get("tcp_outsegs").unwrap(), 8712634);
        assert_eq!(counters.get("tcp_currestab").unwrap(), 37);
        assert_eq!(counters.get("net_pps_receive").unwrap(), 55120);
        assert_eq!(counters.get("net_pps_transmit").unwrap(), 51002);
        assert!(matches!(
            counters.get("udp_outdatagrams"),
            Err(ProbeError::MarkerNotFound(m)) if m == "datagrams sent"
        ));
    }

    #[test]
    fn test_page_activity() {
        assert_eq!(
            parse_page_activity(VMSTAT).unwrap(),
            PageActivity { page_in: 12, page_out: 34 }
        );
        assert!(parse_page_activity("procs\n").is_err());
    }

    #[test]
    fn test_memory_english_and_localized() {
        let english = "\
               total        used        free      shared  buff/cache   available
Mem:        16303460     4211232     9120044      312000     2972184    11446112
Swap:        2097148           0     2097148
";
        let memory = parse_memory(english).unwrap();
        assert_eq!(memory.total_kb, 16303460.0);
        assert_eq!(memory.free_kb, 9120044.0);
        assert_eq!(memory.reserved_kb, 16303460.0 - 4211232.0);

        let russian = "              всего        занято        свободно\nПамять:     8000000     2000000     5000000\n";
        assert_eq!(parse_memory(russian).unwrap().reserved_kb, 6000000.0);

        assert!(matches!(
            parse_memory("Swap: 1 2 3"),
            Err(ProbeError::MarkerNotFound(_))
        ));
    }

    #[test]
    fn test_cpu_kernel() {
        let kernel = parse_cpu_kernel(MPSTAT).unwrap();
        assert!((kernel - 2.12).abs() < 1e-9);

        let no_all = "CPU %idle\n";
        assert!(matches!(
            parse_cpu_kernel(no_all),
            Err(ProbeError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_interface_rate() {
        let ifstat = "\
      eth0                eno1
 KB/s in  KB/s out   KB/s in  KB/s out
    0.10      0.20    812.50     64.25
";
        let rate = parse_interface_rate(ifstat, "eno1").unwrap();
        assert_eq!(rate.receive_kbps, 812.5);
        assert_eq!(rate.transmit_kbps, 64.25);
        assert!(parse_interface_rate(ifstat, "wlan0").is_err());
    }
}
