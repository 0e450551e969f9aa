// src/collector/pass.rs
//! One collection sweep over every disk on the host.

use crate::collector::assembler::MetricsAssembler;
use crate::collector::command::CommandRunner;
use crate::collector::devices::{Device, enumerate_devices};
use crate::record::MetricRecord;
use crate::sink::Sink;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

/// What a sweep produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassSummary {
    /// Devices enumerated
    pub devices: usize,
    /// Records assembled
    pub records: usize,
    /// Successful deliveries per sink name
    pub delivered: BTreeMap<&'static str, usize>,
}

/// Hand a record to every sink. A failing sink does not stop the others.
/// Returns the names of the sinks that accepted it.
pub async fn deliver(sinks: &[Arc<dyn Sink>], record: &MetricRecord) -> Vec<&'static str> {
    let mut accepted = Vec::with_capacity(sinks.len());

    for sink in sinks {
        match sink.write(record).await {
            Ok(()) => accepted.push(sink.name()),
            Err(e) => {
                error!(sink = sink.name(), serial = %record.serial_number, "failed to deliver metrics: {}", e);
            }
        }
    }

    accepted
}

/// Collect and deliver one record for each of `devices`, one worker per
/// device. `max_workers` caps how many run at once.
pub async fn process_devices(
    assembler: &MetricsAssembler,
    sinks: &[Arc<dyn Sink>],
    devices: Vec<Device>,
    max_workers: Option<usize>,
) -> PassSummary {
    let mut summary = PassSummary {
        devices: devices.len(),
        ..Default::default()
    };

    // More permits than devices never helps, and the semaphore panics past MAX_PERMITS.
    let workers_cap = devices.len().max(1);
    let limit = Arc::new(Semaphore::new(
        max_workers.unwrap_or(workers_cap).clamp(1, workers_cap),
    ));
    let sinks: Arc<[Arc<dyn Sink>]> = sinks.into();
    let mut workers = JoinSet::new();

    for device in devices {
        let assembler = assembler.clone();
        let sinks = Arc::clone(&sinks);
        let limit = Arc::clone(&limit);

        workers.spawn(async move {
            let _permit = limit.acquire_owned().await.ok();
            info!(device = %device.path, model = %device.model, "collecting disk metrics");

            let record = assembler.assemble(&device).await;
            deliver(&sinks, &record).await
        });
    }

    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(accepted) => {
                summary.records += 1;
                for name in accepted {
                    *summary.delivered.entry(name).or_default() += 1;
                }
            }
            Err(e) => error!("device worker aborted: {}", e),
        }
    }

    summary
}

/// Enumerate the host's disks and process all of them.
pub async fn run_pass(
    runner: Arc<dyn CommandRunner>,
    assembler: &MetricsAssembler,
    sinks: &[Arc<dyn Sink>],
    max_workers: Option<usize>,
) -> PassSummary {
    let devices = enumerate_devices(runner.as_ref()).await;
    if devices.is_empty() {
        info!("no disks found");
    }

    process_devices(assembler, sinks, devices, max_workers).await
}
