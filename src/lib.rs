// src/lib.rs
//! Per-disk SMART and host performance collection.
//!
//! One pass enumerates the physical disks, runs every diagnostic tool for
//! each of them, folds the output into a fixed-schema [`record::MetricRecord`]
//! and hands it to the configured [`sink::Sink`]s.

pub mod collector;
pub mod config;
pub mod error;
pub mod record;
pub mod sink;
