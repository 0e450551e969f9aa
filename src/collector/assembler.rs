// src/collector/assembler.rs
//! Runs every probe for one device and merges the results into a record.

use crate::collector::command::CommandRunner;
use crate::collector::devices::Device;
use crate::collector::disk::{self, ThroughputUnit};
use crate::collector::host;
use crate::collector::smart::{self, SmartRegistry, UNKNOWN_STATUS};
use crate::error::ProbeResult;
use crate::record::MetricRecord;
use chrono::Local;
use std::sync::Arc;
use tracing::{debug, error};

/// Read-only settings shared by all device workers.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// Interface whose receive rate is reported
    pub interface: String,
    pub unit: ThroughputUnit,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            interface: "eno1".to_string(),
            unit: ThroughputUnit::default(),
        }
    }
}

/// Downgrade a failed probe to `default`, logging why.
fn or_default<T>(result: ProbeResult<T>, default: T, device: &str, metric: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            error!(
                device,
                metric,
                category = e.category(),
                "probe failed, using default: {}",
                e
            );
            default
        }
    }
}

/// Builds one `MetricRecord` per device from independent probes.
#[derive(Clone)]
pub struct MetricsAssembler {
    runner: Arc<dyn CommandRunner>,
    registry: Arc<SmartRegistry>,
    settings: ProbeSettings,
}

impl MetricsAssembler {
    pub fn new(runner: Arc<dyn CommandRunner>, registry: Arc<SmartRegistry>, settings: ProbeSettings) -> Self {
        Self {
            runner,
            registry,
            settings,
        }
    }

    /// Collect every metric for `device`. Probes run concurrently and a
    /// failing probe only affects its own fields; this never fails.
    pub async fn assemble(&self, device: &Device) -> MetricRecord {
        let runner = self.runner.as_ref();
        let path = device.path.as_str();
        let key = device.name();
        let keys = [key];

        debug!(device = path, "collecting metrics");

        // The record is stamped when collection starts, not when the slowest tool returns.
        let date = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let (attributes, health, iostat, totals, net, pages, memory, cpu_kernel, rate) = tokio::join!(
            smart::collect_smart_attributes(runner, path, &self.registry),
            smart::collect_health_status(runner, path),
            disk::collect_extended(runner),
            disk::collect_totals(runner, &keys),
            host::collect_net_counters(runner),
            host::collect_page_activity(runner),
            host::collect_memory(runner),
            host::collect_cpu_kernel(runner),
            host::collect_interface_rate(runner, &self.settings.interface),
        );

        let mut record = MetricRecord::empty(
            date,
            device.serial_number.clone(),
            device.model.clone(),
            or_default(health, UNKNOWN_STATUS.to_string(), path, "disk_status"),
            &self.registry,
        );

        for attribute in or_default(attributes, Vec::new(), path, "smart") {
            if let Some(label) = self.registry.label(attribute.id) {
                debug!(device = path, id = attribute.id, label, raw = attribute.raw, "smart attribute");
            }
            record.set_smart(attribute);
        }

        // Each iostat column is isolated from the others.
        match iostat {
            Ok(iostat) => {
                let unit = self.settings.unit;
                record.io_queue_size = or_default(iostat.io_queue_size(key), 0.0, path, "io_queue_size");
                record.read_throughput =
                    or_default(iostat.read_throughput(key, unit), 0.0, path, "read_throughput");
                record.read_queue_time = or_default(iostat.read_queue_time(key), 0.0, path, "read_queue_time");
                record.read_qps = or_default(iostat.read_qps(key), 0.0, path, "read_qps");
                record.write_qps = or_default(iostat.write_qps(key), 0.0, path, "write_qps");
                record.write_queue_time =
                    or_default(iostat.write_queue_time(key), 0.0, path, "write_queue_time");
                record.write_throughput =
                    or_default(iostat.write_throughput(key, unit), 0.0, path, "write_throughput");

                let util = or_default(iostat.utilization(&keys), Default::default(), path, "disk_util");
                record.disk_max_util = util.max;
                record.disk_avg_util = util.avg;
            }
            Err(e) => {
                error!(device = path, metric = "iostat", category = e.category(), "probe failed, using default: {}", e);
            }
        }

        let totals = or_default(totals, Default::default(), path, "disk_summary");
        record.total_disk_read_kb = totals.read_kb;
        record.total_disk_write_kb = totals.write_kb;

        match net {
            Ok(net) => {
                record.tcp_outsegs = or_default(net.get("tcp_outsegs"), 0, path, "tcp_outsegs");
                record.udp_outdatagrams = or_default(net.get("udp_outdatagrams"), 0, path, "udp_outdatagrams");
                record.udp_indatagrams = or_default(net.get("udp_indatagrams"), 0, path, "udp_indatagrams");
                record.net_pps_receive = or_default(net.get("net_pps_receive"), 0, path, "net_pps_receive");
                record.net_pps_transmit = or_default(net.get("net_pps_transmit"), 0, path, "net_pps_transmit");
                record.tcp_currestab = or_default(net.get("tcp_currestab"), 0, path, "tcp_currestab");
            }
            Err(e) => {
                error!(device = path, metric = "netstat", category = e.category(), "probe failed, using default: {}", e);
            }
        }

        let pages = or_default(pages, Default::default(), path, "page_activity");
        record.page_in = pages.page_in;
        record.page_out = pages.page_out;

        record.mem_res = or_default(memory, Default::default(), path, "mem_res").reserved_kb;
        record.cpu_kernel = or_default(cpu_kernel, 0.0, path, "cpu_kernel");
        record.receive_speed = or_default(rate, Default::default(), path, "receive_speed").receive_kbps;

        record
    }
}
