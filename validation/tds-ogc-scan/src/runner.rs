//! Catalogue walk and probe orchestration.

use futures::stream::{self, StreamExt};
use ogc_common::{HttpClient, Protocol, ScanResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use thredds_catalog::{fetch_and_parse, resolve_in, Resolution, ResolvedEndpoint};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{ScanConfig, SuccessPolicy};
use crate::metrics::ScanStatistics;
use crate::probe::{self, ProbeOutcome};

/// Why a protocol was not probed for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unavailable {
    NotOffered,
    AccessMissing,
}

/// Everything that happened for one catalogue entry.
#[derive(Debug, Clone, Serialize)]
pub struct EntryReport {
    /// Position of the entry in the top-level catalogue.
    pub index: usize,
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalogue_error: Option<String>,
    pub unavailable: Vec<(Protocol, Unavailable)>,
    /// Probes in the order they were issued.
    pub probes: Vec<ProbeOutcome>,
}

impl EntryReport {
    fn new(index: usize, uri: String) -> Self {
        Self {
            index,
            uri,
            catalogue_error: None,
            unavailable: Vec::new(),
            probes: Vec::new(),
        }
    }

    /// Fold this entry into the scan statistics.
    pub fn tally(&self, stats: &mut ScanStatistics) {
        stats.entries_visited += 1;
        if self.catalogue_error.is_some() {
            stats.record_catalogue_error();
        }
        for (protocol, reason) in &self.unavailable {
            match reason {
                Unavailable::NotOffered => stats.record_not_offered(*protocol),
                Unavailable::AccessMissing => stats.record_access_missing(*protocol),
            }
        }
        for outcome in &self.probes {
            stats.record_probe(outcome);
        }
    }

    pub fn passed(&self, policy: SuccessPolicy) -> bool {
        let mut stats = ScanStatistics::new();
        self.tally(&mut stats);
        stats.passed(policy)
    }
}

/// Result of a completed scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    /// RFC 3339 start time of the scan.
    pub timestamp: String,
    pub catalog_uri: String,
    pub statistics: ScanStatistics,
    pub entries: Vec<EntryReport>,
}

impl ScanOutcome {
    pub fn passed(&self, policy: SuccessPolicy) -> bool {
        self.statistics.passed(policy)
    }

    pub fn probes(&self) -> impl Iterator<Item = &ProbeOutcome> + '_ {
        self.entries.iter().flat_map(|e| e.probes.iter())
    }
}

/// Walks a THREDDS catalogue and probes every selected entry.
pub struct Scanner {
    http: HttpClient,
    config: ScanConfig,
}

impl Scanner {
    /// Validate `config` and build the HTTP client. Nothing is fetched yet.
    pub fn new(config: ScanConfig) -> ScanResult<Self> {
        config.validate()?;
        let http = HttpClient::new(config.request_timeout())?;
        Ok(Self { http, config })
    }

    pub fn with_client(config: ScanConfig, http: HttpClient) -> ScanResult<Self> {
        config.validate()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Run the scan.
    ///
    /// Only a failure on the top-level catalogue is an error; anything that
    /// goes wrong for an individual entry is counted and the scan moves on.
    #[instrument(skip(self), fields(catalogue = %self.config.catalog_uri))]
    pub async fn run(&self) -> ScanResult<ScanOutcome> {
        let timestamp = chrono::Utc::now().to_rfc3339();
        let top = fetch_and_parse(&self.http, &self.config.catalog_uri).await?;
        let entry_uris = top.entry_uris();

        let mut statistics = ScanStatistics::new();
        statistics.entries_listed = entry_uris.len() as u64;

        let indices = select_indices(entry_uris.len(), self.config.sample_size, self.config.seed);
        info!(
            listed = entry_uris.len(),
            selected = indices.len(),
            concurrency = self.config.concurrency,
            "Catalogue listed"
        );

        let mut selected = Vec::with_capacity(indices.len());
        for index in indices {
            let uri = &entry_uris[index];
            if let Some(filter) = &self.config.entries_filter {
                if !filter.iter().any(|f| f == uri) {
                    debug!(entry = index, uri = %uri, "Not in entries filter, skipping");
                    statistics.entries_filtered_out += 1;
                    continue;
                }
            }
            selected.push((index, uri.clone()));
        }

        let mut reports = stream::iter(selected)
            .map(|(index, uri)| self.probe_entry(index, uri))
            .buffered(self.config.concurrency);

        let mut entries = Vec::new();
        while let Some(report) = reports.next().await {
            report.tally(&mut statistics);
            entries.push(report);
        }

        log_summary(&statistics, self.config.success_policy);

        Ok(ScanOutcome {
            timestamp,
            catalog_uri: self.config.catalog_uri.clone(),
            statistics,
            entries,
        })
    }

    /// Fetch one entry's catalogue and run every probe it supports.
    pub async fn probe_entry(&self, index: usize, uri: String) -> EntryReport {
        info!(entry = index, uri = %uri, "Probing entry");
        let mut report = EntryReport::new(index, uri);

        let doc = match fetch_and_parse(&self.http, &report.uri).await {
            Ok(doc) => doc,
            Err(e) => {
                error!(entry = index, uri = %report.uri, error = %e, "Entry catalogue unavailable");
                report.catalogue_error = Some(e.to_string());
                return report;
            }
        };

        for protocol in Protocol::ALL {
            if !self.config.probes(protocol) {
                continue;
            }
            match resolve_in(&doc, protocol) {
                Resolution::Resolved(endpoint) => {
                    report.probes.extend(probe_endpoint(&self.http, &endpoint).await);
                }
                Resolution::NoService => {
                    report.unavailable.push((protocol, Unavailable::NotOffered));
                }
                Resolution::NoAccessPath { .. } => {
                    report.unavailable.push((protocol, Unavailable::AccessMissing));
                }
            }
        }

        report
    }
}

/// Run the probe sequence for one resolved endpoint. Never short-circuits:
/// WCS DescribeCoverage runs even when GetCapabilities failed. WMS GetMap
/// needs a layer name, so it only follows a GetCapabilities that listed one.
pub async fn probe_endpoint(http: &HttpClient, endpoint: &ResolvedEndpoint) -> Vec<ProbeOutcome> {
    match endpoint.protocol {
        Protocol::Wms => {
            let capabilities = probe::wms_get_capabilities(http, endpoint).await;
            let first_layer = capabilities.layer_names.first().cloned();
            let mut outcomes = vec![capabilities];
            match first_layer {
                Some(layer) => outcomes.push(probe::wms_get_map(http, endpoint, &layer).await),
                None => debug!(endpoint = %endpoint.uri, "No layer name, GetMap not attempted"),
            }
            outcomes
        }
        Protocol::Wcs => vec![
            probe::wcs_get_capabilities(http, endpoint).await,
            probe::wcs_describe_coverage(http, endpoint).await,
        ],
    }
}

/// Entry indices to visit, ascending.
///
/// With a sample size, that many distinct indices are drawn uniformly
/// without replacement, clamped to `total`.
pub fn select_indices(total: usize, sample_size: Option<usize>, seed: Option<u64>) -> Vec<usize> {
    let Some(requested) = sample_size else {
        return (0..total).collect();
    };

    let amount = requested.min(total);
    if amount < requested {
        warn!(requested, available = total, "Sample size exceeds entry count, clamping");
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut indices = rand::seq::index::sample(&mut rng, total, amount).into_vec();
    indices.sort_unstable();
    indices
}

/// Scan `catalog_uri` with default settings, optionally restricted to
/// `entries_filter` or a random `sample_size` subset (not both).
pub async fn scan(
    catalog_uri: &str,
    entries_filter: Option<Vec<String>>,
    sample_size: Option<usize>,
) -> ScanResult<ScanStatistics> {
    let mut config = ScanConfig::new(catalog_uri);
    config.entries_filter = entries_filter;
    config.sample_size = sample_size;

    let outcome = Scanner::new(config)?.run().await?;
    Ok(outcome.statistics)
}

fn log_summary(stats: &ScanStatistics, policy: SuccessPolicy) {
    info!(
        listed = stats.entries_listed,
        visited = stats.entries_visited,
        filtered_out = stats.entries_filtered_out,
        catalogue_errors = stats.catalogue_errors,
        "Scan complete"
    );

    for kind in probe::ProbeKind::ALL {
        let counter = stats.counter(kind);
        if counter.is_clean() {
            info!(probe = %kind, attempted = counter.attempted, succeeded = counter.succeeded, "  OK");
        } else {
            warn!(probe = %kind, attempted = counter.attempted, succeeded = counter.succeeded, "  FAILURES");
        }
    }

    for protocol in Protocol::ALL {
        let coverage = stats.coverage(protocol);
        if coverage.access_missing > 0 {
            warn!(
                %protocol,
                entries = coverage.access_missing,
                "Service declared without access path at dataset/dataset/access"
            );
        }
    }

    if stats.passed(policy) {
        info!(?policy, "Scan passed");
    } else {
        warn!(?policy, failed = stats.total_failed(), "Scan failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_all_without_sample() {
        assert_eq!(select_indices(4, None, None), vec![0, 1, 2, 3]);
        assert!(select_indices(0, None, None).is_empty());
    }

    #[test]
    fn test_sample_is_distinct_sorted_and_in_range() {
        let indices = select_indices(50, Some(10), Some(7));
        assert_eq!(indices.len(), 10);
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
        assert!(indices.iter().all(|i| *i < 50));
    }

    #[test]
    fn test_sample_larger_than_catalogue_is_clamped() {
        assert_eq!(select_indices(3, Some(10), None), vec![0, 1, 2]);
        assert!(select_indices(0, Some(2), None).is_empty());
    }

    #[test]
    fn test_seed_makes_sample_reproducible() {
        assert_eq!(
            select_indices(100, Some(5), Some(42)),
            select_indices(100, Some(5), Some(42))
        );
    }

    #[test]
    fn test_scanner_rejects_filter_with_sample() {
        let mut config = ScanConfig::new("http://127.0.0.1:9/thredds/catalog.xml");
        config.entries_filter = Some(vec![]);
        config.sample_size = Some(1);
        assert!(Scanner::new(config).is_err());
    }

    #[test]
    fn test_entry_report_tally() {
        let mut report = EntryReport::new(0, "http://h/thredds/a/catalog.xml".into());
        report.unavailable.push((Protocol::Wcs, Unavailable::AccessMissing));
        report.catalogue_error = None;

        let mut stats = ScanStatistics::new();
        report.tally(&mut stats);
        assert_eq!(stats.entries_visited, 1);
        assert_eq!(stats.wcs.access_missing, 1);
        assert!(report.passed(SuccessPolicy::All));
    }
}
