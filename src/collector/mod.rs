// src/collector/mod.rs

pub mod assembler;
pub mod command;
pub mod devices;
pub mod disk;
pub mod host;
pub mod pass;
pub mod scanner;
pub mod smart;
pub mod sys;
pub mod table;

pub use assembler::{MetricsAssembler, ProbeSettings};
pub use command::{CannedRunner, CommandRunner, SystemRunner, ToolOutput};
pub use devices::{Device, enumerate_devices};
pub use disk::ThroughputUnit;
pub use pass::{PassSummary, process_devices, run_pass};
pub use smart::{SmartAttribute, SmartRegistry};
pub use sys::get_hostname;
