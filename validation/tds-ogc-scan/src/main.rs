//! THREDDS OGC endpoint scanner CLI.
//!
//! Exit status: 0 when the scan passes its success policy, 1 when it does
//! not, 2 on configuration errors or an unreachable top-level catalogue.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ogc_common::{HttpClient, Protocol};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use tds_ogc_scan::config::CATALOG_URI_ENV;
use tds_ogc_scan::report::{DEFAULT_DELIMITER, DEFAULT_REPORT_PATH};
use tds_ogc_scan::{generate_cases, ScanConfig, ScanReport, Scanner, SuccessPolicy};

#[derive(Parser)]
#[command(name = "tds-ogc-scan")]
#[command(about = "Check the WMS/WCS endpoints published in a THREDDS catalogue", long_about = None)]
struct Cli {
    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log format: text (default), json
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a catalogue and probe every selected entry
    Scan {
        /// Top-level catalogue URI
        #[arg(env = "TDS_OGC_SCAN_CATALOG_URI")]
        catalog_uri: Option<String>,

        /// Only probe these entry catalogue URIs. A single number is taken
        /// as the sample size.
        entries: Vec<String>,

        /// Probe this many randomly chosen entries
        #[arg(short, long)]
        sample: Option<usize>,

        /// RNG seed for reproducible sampling
        #[arg(long)]
        seed: Option<u64>,

        /// Protocols to probe (e.g. wms,wcs)
        #[arg(long, value_delimiter = ',')]
        protocols: Vec<Protocol>,

        /// Success policy: all, wms-only
        #[arg(long)]
        policy: Option<SuccessPolicy>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Entries probed concurrently
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Write a per-probe CSV report (default file name if no path given)
        #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_REPORT_PATH)]
        report: Option<PathBuf>,

        /// CSV report field delimiter
        #[arg(long, default_value_t = DEFAULT_DELIMITER)]
        report_delimiter: char,

        /// Output format: table (default), json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// YAML scan configuration; command-line options override it
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List the per-entry cases of a catalogue
    Cases {
        /// Top-level catalogue URI
        #[arg(env = "TDS_OGC_SCAN_CATALOG_URI")]
        catalog_uri: Option<String>,

        /// Also run every case and report pass/fail
        #[arg(long)]
        run: bool,

        /// Success policy applied to each case
        #[arg(long, default_value = "all")]
        policy: SuccessPolicy,

        /// Per-request timeout in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.log_level, &cli.log_format) {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(2);
    }

    let result = match cli.command {
        Commands::Scan {
            catalog_uri,
            entries,
            sample,
            seed,
            protocols,
            policy,
            timeout,
            concurrency,
            report,
            report_delimiter,
            output,
            config,
        } => {
            let (entries_filter, legacy_sample) = split_legacy_sample(entries);
            let overrides = ScanOverrides {
                catalog_uri,
                entries_filter,
                sample: sample.or(legacy_sample),
                seed,
                protocols,
                policy,
                timeout,
                concurrency,
            };
            run_scan(config, overrides, report, report_delimiter, &output).await
        }
        Commands::Cases {
            catalog_uri,
            run,
            policy,
            timeout,
        } => run_cases(catalog_uri, run, policy, timeout).await,
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!(error = %e, "Scan aborted");
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn init_tracing(log_level: &str, log_format: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    match log_format {
        "json" => tracing::subscriber::set_global_default(builder.json().finish())?,
        _ => tracing::subscriber::set_global_default(builder.finish())?,
    }
    Ok(())
}

/// Command-line values that take precedence over the YAML configuration.
struct ScanOverrides {
    catalog_uri: Option<String>,
    entries_filter: Option<Vec<String>>,
    sample: Option<usize>,
    seed: Option<u64>,
    protocols: Vec<Protocol>,
    policy: Option<SuccessPolicy>,
    timeout: Option<u64>,
    concurrency: Option<usize>,
}

fn build_config(config_path: Option<PathBuf>, o: ScanOverrides) -> Result<ScanConfig> {
    let mut config = match (config_path, o.catalog_uri.as_deref()) {
        (Some(path), _) => ScanConfig::from_file(&path)
            .with_context(|| format!("Failed to load scan config {}", path.display()))?,
        (None, Some(uri)) => ScanConfig::new(uri),
        (None, None) => anyhow::bail!(
            "No catalogue URI given; pass one or set {}",
            CATALOG_URI_ENV
        ),
    };

    if let Some(uri) = o.catalog_uri {
        config.catalog_uri = uri;
    }
    if o.entries_filter.is_some() {
        config.entries_filter = o.entries_filter;
    }
    if o.sample.is_some() {
        config.sample_size = o.sample;
    }
    if o.seed.is_some() {
        config.seed = o.seed;
    }
    if !o.protocols.is_empty() {
        config.protocols = o.protocols;
    }
    if let Some(policy) = o.policy {
        config.success_policy = policy;
    }
    if let Some(timeout) = o.timeout {
        config.request_timeout_secs = timeout;
    }
    if let Some(concurrency) = o.concurrency {
        config.concurrency = concurrency;
    }

    config.validate()?;
    Ok(config)
}

async fn run_scan(
    config_path: Option<PathBuf>,
    overrides: ScanOverrides,
    report: Option<PathBuf>,
    delimiter: char,
    output: &str,
) -> Result<bool> {
    let config = build_config(config_path, overrides)?;
    let policy = config.success_policy;

    info!(
        catalogue = %config.catalog_uri,
        protocols = ?config.protocols,
        sample = ?config.sample_size,
        filter = config.entries_filter.as_ref().map(|f| f.len()),
        "Starting scan"
    );

    let scanner = Scanner::new(config)?;
    let outcome = scanner.run().await?;

    if let Some(path) = report {
        ScanReport::write_csv(&outcome, &path, delimiter)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!(path = %path.display(), "Report written");
    }

    match output {
        "json" => println!("{}", ScanReport::format_json(&outcome)?),
        _ => println!(
            "{}",
            ScanReport::format_table(&outcome.catalog_uri, &outcome.statistics, policy)
        ),
    }

    Ok(outcome.passed(policy))
}

async fn run_cases(
    catalog_uri: Option<String>,
    run: bool,
    policy: SuccessPolicy,
    timeout: u64,
) -> Result<bool> {
    let catalog_uri = catalog_uri.with_context(|| {
        format!("No catalogue URI given; pass one or set {}", CATALOG_URI_ENV)
    })?;

    let mut config = ScanConfig::new(catalog_uri.as_str());
    config.request_timeout_secs = timeout;
    config.success_policy = policy;
    let http = HttpClient::new(config.request_timeout())?;
    let scanner = Scanner::with_client(config, http.clone())?;

    let cases = generate_cases(&http, &catalog_uri).await?;
    let mut all_passed = true;
    for case in &cases {
        if run {
            let passed = case.check(&scanner, policy).await;
            all_passed &= passed;
            println!(
                "{}  {}  {}",
                case.name,
                if passed { "PASS" } else { "FAIL" },
                case.entry_uri
            );
        } else {
            println!("{}  {}", case.name, case.entry_uri);
        }
    }

    Ok(all_passed)
}

/// Treat a lone all-digits positional as the sample size.
fn split_legacy_sample(entries: Vec<String>) -> (Option<Vec<String>>, Option<usize>) {
    if let [only] = entries.as_slice() {
        if !only.is_empty() && only.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(n) = only.parse() {
                return (None, Some(n));
            }
        }
    }
    if entries.is_empty() {
        (None, None)
    } else {
        (Some(entries), None)
    }
}
