//! WMS/WCS health checks for THREDDS data servers.
//!
//! This crate provides tools to:
//! - Walk a THREDDS catalogue and resolve each entry's OGC service roots
//! - Probe WMS GetCapabilities/GetMap and WCS GetCapabilities/DescribeCoverage
//! - Aggregate per-scan statistics and judge them under a success policy
//! - Output results as a console table, JSON, or a per-probe CSV report

pub mod cases;
pub mod config;
pub mod metrics;
pub mod probe;
pub mod report;
pub mod runner;

pub use cases::{generate_cases, EntryCase};
pub use config::{ScanConfig, SuccessPolicy};
pub use metrics::{ProbeCounter, ProtocolCoverage, ScanStatistics};
pub use probe::{ProbeKind, ProbeOutcome};
pub use report::ScanReport;
pub use runner::{scan, EntryReport, ScanOutcome, Scanner, Unavailable};
