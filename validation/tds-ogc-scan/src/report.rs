//! Scan summaries and the per-probe CSV report.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use ogc_common::Protocol;

use crate::config::SuccessPolicy;
use crate::metrics::ScanStatistics;
use crate::probe::{ProbeKind, ProbeOutcome};
use crate::runner::ScanOutcome;

/// Report file written when no path is given.
pub const DEFAULT_REPORT_PATH: &str = "wms-error-report.csv";

pub const DEFAULT_DELIMITER: char = '$';

/// Formats scan results for output.
pub struct ScanReport;

impl ScanReport {
    /// Format statistics as a console table.
    pub fn format_table(catalog_uri: &str, stats: &ScanStatistics, policy: SuccessPolicy) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec!["Probe", "Attempted", "Succeeded", "Failed"]);

        for kind in ProbeKind::ALL {
            let counter = stats.counter(kind);
            table.add_row(vec![
                kind.to_string(),
                counter.attempted.to_string(),
                counter.succeeded.to_string(),
                counter.failed().to_string(),
            ]);
        }

        let mut summary = Table::new();
        summary
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![format!("Catalogue: {}", catalog_uri)]);

        summary.add_row(vec!["Entries listed:", &stats.entries_listed.to_string()]);
        summary.add_row(vec!["Entries visited:", &stats.entries_visited.to_string()]);
        summary.add_row(vec![
            "Entries filtered out:",
            &stats.entries_filtered_out.to_string(),
        ]);
        summary.add_row(vec!["Catalogue errors:", &stats.catalogue_errors.to_string()]);
        for protocol in Protocol::ALL {
            let coverage = stats.coverage(protocol);
            summary.add_row(vec![
                format!("{} not offered / no access:", protocol),
                format!("{} / {}", coverage.not_offered, coverage.access_missing),
            ]);
        }
        let verdict = if stats.passed(policy) { "PASS" } else { "FAIL" };
        summary.add_row(vec![format!("Result ({:?}):", policy), verdict.to_string()]);

        format!("{}\n{}", summary, table)
    }

    /// Format the whole outcome as JSON.
    pub fn format_json(outcome: &ScanOutcome) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(outcome)?)
    }

    /// CSV header row.
    pub fn csv_header(delimiter: char) -> String {
        ["uri", "status", "probe", "ok", "body"].join(&delimiter.to_string())
    }

    /// One CSV row for a probe. The status is empty when no response arrived.
    pub fn format_csv(outcome: &ProbeOutcome, delimiter: char) -> String {
        let status = outcome.status.map(|s| s.to_string()).unwrap_or_default();
        let kind = outcome.kind.to_string();
        let ok = outcome.ok.to_string();
        let body = outcome.body.as_deref().unwrap_or("");

        [outcome.uri.as_str(), &status, &kind, &ok, body]
            .iter()
            .map(|field| quote_minimal(field, delimiter))
            .collect::<Vec<_>>()
            .join(&delimiter.to_string())
    }

    /// Write every probe of `outcome` to `path`.
    pub fn write_csv(outcome: &ScanOutcome, path: impl AsRef<Path>, delimiter: char) -> anyhow::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "{}", Self::csv_header(delimiter))?;
        for probe in outcome.probes() {
            writeln!(writer, "{}", Self::format_csv(probe, delimiter))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Quote a field only when it contains the delimiter, a quote or a line break.
fn quote_minimal(field: &str, delimiter: char) -> String {
    if field.contains(|c: char| c == delimiter || c == '"' || c == '\n' || c == '\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
