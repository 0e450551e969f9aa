// src/collector/sys.rs
//! Host identity used to label a collection pass.

use sysinfo::System;

/// Function to extract hostname of the system.
pub fn get_hostname() -> String {
    System::host_name().unwrap_or_else(|| "unknown".to_string())
}
