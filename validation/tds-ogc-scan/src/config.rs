//! Scan configuration, OGC query strings and the success policy.

use std::path::Path;
use std::time::Duration;

use ogc_common::{Protocol, ScanError, ScanResult};
use serde::{Deserialize, Serialize};

pub const WMS_GET_CAPABILITIES_QUERY_ARGS: &str =
    "?service=WMS&version=1.3.0&request=GetCapabilities";

/// `{layer}` is replaced by the first layer from GetCapabilities.
pub const WMS_GET_MAP_QUERY_ARGS: &str = "?service=WMS&version=1.3.0&request=GetMap\
    &BBOX=-180,-90,180,90&LAYERS={layer}&CRS=CRS:84&WIDTH=256&HEIGHT=256&STYLES=\
    &FORMAT=image/png&COLORSCALERANGE=auto";

pub const WCS_GET_CAPABILITIES_QUERY_ARGS: &str =
    "?service=WCS&version=1.0.0&request=GetCapabilities";

pub const WCS_DESCRIBE_COVERAGE_QUERY_ARGS: &str =
    "?service=WCS&version=1.0.0&request=DescribeCoverage";

/// Environment variable holding the default catalogue URI.
pub const CATALOG_URI_ENV: &str = "TDS_OGC_SCAN_CATALOG_URI";

/// GetMap query string for `layer`, percent-encoding the layer name.
pub fn wms_get_map_query_args(layer: &str) -> String {
    WMS_GET_MAP_QUERY_ARGS.replace("{layer}", &urlencoding::encode(layer))
}

/// Which probe failures make a scan fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuccessPolicy {
    /// Every attempted probe and every entry catalogue fetch must succeed.
    #[default]
    All,
    /// Only WMS probes count.
    WmsOnly,
}

impl std::str::FromStr for SuccessPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(SuccessPolicy::All),
            "wms-only" | "wms_only" | "wms" => Ok(SuccessPolicy::WmsOnly),
            other => Err(format!("unknown success policy '{}'", other)),
        }
    }
}

/// Scan configuration, loadable from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Top-level THREDDS catalogue URI.
    pub catalog_uri: String,
    /// Only probe entries whose URI is in this list.
    #[serde(default)]
    pub entries_filter: Option<Vec<String>>,
    /// Probe this many randomly chosen entries.
    #[serde(default)]
    pub sample_size: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>, // Optional RNG seed for reproducible sampling
    #[serde(default = "default_protocols")]
    pub protocols: Vec<Protocol>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Entries probed in flight at once; 1 keeps the scan strictly sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub success_policy: SuccessPolicy,
}

fn default_protocols() -> Vec<Protocol> {
    Protocol::ALL.to_vec()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_concurrency() -> usize {
    1
}

impl ScanConfig {
    /// Configuration with defaults for everything but the catalogue URI.
    pub fn new(catalog_uri: impl Into<String>) -> Self {
        Self {
            catalog_uri: catalog_uri.into(),
            entries_filter: None,
            sample_size: None,
            seed: None,
            protocols: default_protocols(),
            request_timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            success_policy: SuccessPolicy::default(),
        }
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ScanConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validate configuration.
    ///
    /// Must pass before any request is made.
    pub fn validate(&self) -> ScanResult<()> {
        if self.entries_filter.is_some() && self.sample_size.is_some() {
            return Err(ScanError::Config(
                "entries filter and sample size are mutually exclusive".to_string(),
            ));
        }
        if self.catalog_uri.trim().is_empty() {
            return Err(ScanError::Config("catalogue URI must be set".to_string()));
        }
        if self.concurrency == 0 {
            return Err(ScanError::Config("concurrency must be > 0".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ScanError::Config("request_timeout_secs must be > 0".to_string()));
        }
        if self.protocols.is_empty() {
            return Err(ScanError::Config("at least one protocol must be selected".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probes(&self, protocol: Protocol) -> bool {
        self.protocols.contains(&protocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_map_query_substitutes_encoded_layer() {
        let q = wms_get_map_query_args("sst/analysed sst");
        assert!(q.starts_with("?service=WMS&version=1.3.0&request=GetMap&BBOX=-180,-90,180,90&"));
        assert!(q.contains("&LAYERS=sst%2Fanalysed%20sst&CRS=CRS:84&"));
        assert!(q.ends_with("&FORMAT=image/png&COLORSCALERANGE=auto"));
        assert!(!q.contains(' '));
    }

    #[test]
    fn test_filter_and_sample_are_exclusive() {
        let mut config = ScanConfig::new("http://h/thredds/catalog.xml");
        assert!(config.validate().is_ok());

        config.entries_filter = Some(vec!["http://h/thredds/a/catalog.xml".into()]);
        config.sample_size = Some(3);
        assert!(matches!(config.validate(), Err(ScanError::Config(_))));
    }

    #[test]
    fn test_yaml_defaults() {
        let config: ScanConfig =
            serde_yaml::from_str("catalog_uri: http://h/thredds/catalog.xml\n").unwrap();
        assert_eq!(config.protocols, vec![Protocol::Wms, Protocol::Wcs]);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.success_policy, SuccessPolicy::All);
        assert!(config.entries_filter.is_none());
    }

    #[test]
    fn test_yaml_full() {
        let yaml = r#"
catalog_uri: https://tds.example.org/thredds/catalog.xml
sample_size: 5
seed: 42
protocols: [wms]
request_timeout_secs: 10
concurrency: 4
success_policy: wms-only
"#;
        let config: ScanConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.sample_size, Some(5));
        assert_eq!(config.seed, Some(42));
        assert!(config.probes(Protocol::Wms));
        assert!(!config.probes(Protocol::Wcs));
        assert_eq!(config.success_policy, SuccessPolicy::WmsOnly);
        config.validate().unwrap();
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("ALL".parse::<SuccessPolicy>().unwrap(), SuccessPolicy::All);
        assert_eq!("wms-only".parse::<SuccessPolicy>().unwrap(), SuccessPolicy::WmsOnly);
        assert!("some".parse::<SuccessPolicy>().is_err());
    }
}
