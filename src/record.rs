// src/record.rs
//! The per-device metric record and its column schema.

use crate::collector::smart::{SmartAttribute, SmartRegistry};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Fixed columns of every record, in persisted order. SMART columns follow.
pub const BASE_FIELDS: [&str; 26] = [
    "date",
    "serial_number",
    "model",
    "disk_status",
    "io_queue_size",
    "read_throughput",
    "read_queue_time",
    "read_qps",
    "write_qps",
    "write_queue_time",
    "write_throughput",
    "disk_max_util",
    "disk_avg_util",
    "tcp_outsegs",
    "page_in",
    "page_out",
    "total_disk_read_kb",
    "total_disk_write_kb",
    "mem_res",
    "cpu_kernel",
    "udp_outdatagrams",
    "udp_indatagrams",
    "net_pps_receive",
    "net_pps_transmit",
    "receive_speed",
    "tcp_currestab",
];

/// Full ordered column list for a registry: the base fields, then
/// `smart_<id>_normalized` and `smart_<id>_raw` per id ascending.
pub fn schema(registry: &SmartRegistry) -> Vec<String> {
    let mut fields: Vec<String> = BASE_FIELDS.iter().map(|f| f.to_string()).collect();
    for id in registry.ids() {
        fields.push(format!("smart_{id}_normalized"));
        fields.push(format!("smart_{id}_raw"));
    }
    fields
}

/// A scalar record value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Text(v) => f.write_str(v),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Int(v) => serializer.serialize_i64(*v),
            FieldValue::Float(v) => serializer.serialize_f64(*v),
            FieldValue::Text(v) => serializer.serialize_str(v),
        }
    }
}

/// One device's metrics for one pass. Built by the assembler and not
/// modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub date: String,
    pub serial_number: String,
    pub model: String,
    pub disk_status: String,
    pub io_queue_size: f64,
    pub read_throughput: f64,
    pub read_queue_time: f64,
    pub read_qps: f64,
    pub write_qps: f64,
    pub write_queue_time: f64,
    pub write_throughput: f64,
    pub disk_max_util: f64,
    pub disk_avg_util: f64,
    pub tcp_outsegs: i64,
    pub page_in: i64,
    pub page_out: i64,
    pub total_disk_read_kb: f64,
    pub total_disk_write_kb: f64,
    pub mem_res: f64,
    pub cpu_kernel: f64,
    pub udp_outdatagrams: i64,
    pub udp_indatagrams: i64,
    pub net_pps_receive: i64,
    pub net_pps_transmit: i64,
    pub receive_speed: f64,
    pub tcp_currestab: i64,
    /// One entry per registered id, ascending.
    pub smart: BTreeMap<u32, SmartAttribute>,
}

impl MetricRecord {
    /// A record with every metric at its default: zero numbers, the given
    /// identity, and a zeroed attribute for each registered SMART id.
    pub fn empty(
        date: String,
        serial_number: String,
        model: String,
        disk_status: String,
        registry: &SmartRegistry,
    ) -> Self {
        let smart = registry
            .ids()
            .map(|id| {
                (
                    id,
                    SmartAttribute {
                        id,
                        ..Default::default()
                    },
                )
            })
            .collect();

        Self {
            date,
            serial_number,
            model,
            disk_status,
            io_queue_size: 0.0,
            read_throughput: 0.0,
            read_queue_time: 0.0,
            read_qps: 0.0,
            write_qps: 0.0,
            write_queue_time: 0.0,
            write_throughput: 0.0,
            disk_max_util: 0.0,
            disk_avg_util: 0.0,
            tcp_outsegs: 0,
            page_in: 0,
            page_out: 0,
            total_disk_read_kb: 0.0,
            total_disk_write_kb: 0.0,
            mem_res: 0.0,
            cpu_kernel: 0.0,
            udp_outdatagrams: 0,
            udp_indatagrams: 0,
            net_pps_receive: 0,
            net_pps_transmit: 0,
            receive_speed: 0.0,
            tcp_currestab: 0,
            smart,
        }
    }

    /// Store a SMART attribute. Ids outside the registry are ignored so the
    /// column set never grows.
    pub fn set_smart(&mut self, attribute: SmartAttribute) {
        if let Some(slot) = self.smart.get_mut(&attribute.id) {
            *slot = attribute;
        }
    }

    /// Column names of this record, in persisted order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields().into_iter().map(|(name, _)| name).collect()
    }

    /// `(column, value)` pairs in persisted order.
    pub fn fields(&self) -> Vec<(String, FieldValue)> {
        use FieldValue::{Float, Int, Text};

        let base = [
            Text(self.date.clone()),
            Text(self.serial_number.clone()),
            Text(self.model.clone()),
            Text(self.disk_status.clone()),
            Float(self.io_queue_size),
            Float(self.read_throughput),
            Float(self.read_queue_time),
            Float(self.read_qps),
            Float(self.write_qps),
            Float(self.write_queue_time),
            Float(self.write_throughput),
            Float(self.disk_max_util),
            Float(self.disk_avg_util),
            Int(self.tcp_outsegs),
            Int(self.page_in),
            Int(self.page_out),
            Float(self.total_disk_read_kb),
            Float(self.total_disk_write_kb),
            Float(self.mem_res),
            Float(self.cpu_kernel),
            Int(self.udp_outdatagrams),
            Int(self.udp_indatagrams),
            Int(self.net_pps_receive),
            Int(self.net_pps_transmit),
            Float(self.receive_speed),
            Int(self.tcp_currestab),
        ];

        let mut fields: Vec<(String, FieldValue)> = BASE_FIELDS
            .iter()
            .map(|name| name.to_string())
            .zip(base)
            .collect();

        for (id, attr) in &self.smart {
            fields.push((format!("smart_{id}_normalized"), Int(attr.normalized)));
            fields.push((format!("smart_{id}_raw"), Int(attr.raw)));
        }

        fields
    }
}

impl Serialize for MetricRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.fields();
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for (name, value) in &fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
