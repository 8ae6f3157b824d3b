//! Per-scan counters.

use ogc_common::Protocol;
use serde::{Deserialize, Serialize};

use crate::config::SuccessPolicy;
use crate::probe::{ProbeKind, ProbeOutcome};

/// Attempted / succeeded pair for one probe kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeCounter {
    pub attempted: u64,
    pub succeeded: u64,
}

impl ProbeCounter {
    pub fn record(&mut self, ok: bool) {
        self.attempted += 1;
        if ok {
            self.succeeded += 1;
        }
    }

    pub fn failed(&self) -> u64 {
        self.attempted - self.succeeded
    }

    pub fn is_clean(&self) -> bool {
        self.attempted == self.succeeded
    }
}

/// Per-protocol resolution counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolCoverage {
    /// Entries whose catalogue declares no service of this protocol.
    pub not_offered: u64,
    /// Entries declaring the service without an access path at the expected depth.
    pub access_missing: u64,
}

/// Statistics for one scan. Counters only ever increase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatistics {
    pub wms_get_capabilities: ProbeCounter,
    pub wms_get_map: ProbeCounter,
    pub wcs_get_capabilities: ProbeCounter,
    pub wcs_describe_coverage: ProbeCounter,

    // Entry-level counts
    pub entries_listed: u64,
    pub entries_visited: u64,
    pub entries_filtered_out: u64,
    pub catalogue_errors: u64,

    pub wms: ProtocolCoverage,
    pub wcs: ProtocolCoverage,
}

impl ScanStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, kind: ProbeKind) -> &ProbeCounter {
        match kind {
            ProbeKind::WmsGetCapabilities => &self.wms_get_capabilities,
            ProbeKind::WmsGetMap => &self.wms_get_map,
            ProbeKind::WcsGetCapabilities => &self.wcs_get_capabilities,
            ProbeKind::WcsDescribeCoverage => &self.wcs_describe_coverage,
        }
    }

    fn counter_mut(&mut self, kind: ProbeKind) -> &mut ProbeCounter {
        match kind {
            ProbeKind::WmsGetCapabilities => &mut self.wms_get_capabilities,
            ProbeKind::WmsGetMap => &mut self.wms_get_map,
            ProbeKind::WcsGetCapabilities => &mut self.wcs_get_capabilities,
            ProbeKind::WcsDescribeCoverage => &mut self.wcs_describe_coverage,
        }
    }

    pub fn coverage(&self, protocol: Protocol) -> &ProtocolCoverage {
        match protocol {
            Protocol::Wms => &self.wms,
            Protocol::Wcs => &self.wcs,
        }
    }

    fn coverage_mut(&mut self, protocol: Protocol) -> &mut ProtocolCoverage {
        match protocol {
            Protocol::Wms => &mut self.wms,
            Protocol::Wcs => &mut self.wcs,
        }
    }

    /// Record a completed probe.
    pub fn record_probe(&mut self, outcome: &ProbeOutcome) {
        self.counter_mut(outcome.kind).record(outcome.ok);
    }

    pub fn record_not_offered(&mut self, protocol: Protocol) {
        self.coverage_mut(protocol).not_offered += 1;
    }

    pub fn record_access_missing(&mut self, protocol: Protocol) {
        self.coverage_mut(protocol).access_missing += 1;
    }

    pub fn record_catalogue_error(&mut self) {
        self.catalogue_errors += 1;
    }

    pub fn total_attempted(&self) -> u64 {
        ProbeKind::ALL.iter().map(|k| self.counter(*k).attempted).sum()
    }

    pub fn total_failed(&self) -> u64 {
        ProbeKind::ALL.iter().map(|k| self.counter(*k).failed()).sum()
    }

    /// Whether the scan counts as healthy under `policy`.
    ///
    /// A scan where nothing was attempted passes: there was nothing to fail.
    pub fn passed(&self, policy: SuccessPolicy) -> bool {
        match policy {
            SuccessPolicy::All => {
                self.catalogue_errors == 0
                    && ProbeKind::ALL.iter().all(|k| self.counter(*k).is_clean())
            }
            SuccessPolicy::WmsOnly => ProbeKind::ALL
                .iter()
                .filter(|k| k.protocol() == Protocol::Wms)
                .all(|k| self.counter(*k).is_clean()),
        }
    }
}
