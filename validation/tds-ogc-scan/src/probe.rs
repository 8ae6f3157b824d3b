//! WMS and WCS probe requests against a resolved service root.
//!
//! A probe never returns an error: transport failures, error statuses and
//! unparseable bodies all become a failed [`ProbeOutcome`].

use std::fmt;

use ogc_common::http::{truncate, LOG_BODY_LIMIT};
use ogc_common::{HttpClient, HttpResponse, Protocol, QName, XmlElement, WMS_NS};
use serde::Serialize;
use thredds_catalog::ResolvedEndpoint;
use tracing::{error, info};

use crate::config::{
    wms_get_map_query_args, WCS_DESCRIBE_COVERAGE_QUERY_ARGS, WCS_GET_CAPABILITIES_QUERY_ARGS,
    WMS_GET_CAPABILITIES_QUERY_ARGS,
};

const CAPABILITY: QName = QName::ns(WMS_NS, "Capability");
const LAYER: QName = QName::ns(WMS_NS, "Layer");
const NAME: QName = QName::ns(WMS_NS, "Name");

/// The four request types issued against service endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    WmsGetCapabilities,
    WmsGetMap,
    WcsGetCapabilities,
    WcsDescribeCoverage,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 4] = [
        ProbeKind::WmsGetCapabilities,
        ProbeKind::WmsGetMap,
        ProbeKind::WcsGetCapabilities,
        ProbeKind::WcsDescribeCoverage,
    ];

    pub fn protocol(&self) -> Protocol {
        match self {
            ProbeKind::WmsGetCapabilities | ProbeKind::WmsGetMap => Protocol::Wms,
            ProbeKind::WcsGetCapabilities | ProbeKind::WcsDescribeCoverage => Protocol::Wcs,
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            ProbeKind::WmsGetCapabilities | ProbeKind::WcsGetCapabilities => "GetCapabilities",
            ProbeKind::WmsGetMap => "GetMap",
            ProbeKind::WcsDescribeCoverage => "DescribeCoverage",
        }
    }

    /// Whether a 2xx response must also be well-formed XML to pass.
    fn expects_xml(&self) -> bool {
        !matches!(self, ProbeKind::WmsGetMap)
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.protocol(), self.operation())
    }
}

/// Result of one probe request.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    pub kind: ProbeKind,
    pub uri: String,
    pub ok: bool,
    /// Absent when no HTTP response was received.
    pub status: Option<u16>,
    /// Layer names from WMS GetCapabilities; always empty for other probes.
    pub layer_names: Vec<String>,
    /// Newline-stripped response body, kept for failed probes only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeOutcome {
    fn new(kind: ProbeKind, uri: String) -> Self {
        Self {
            kind,
            uri,
            ok: false,
            status: None,
            layer_names: Vec::new(),
            body: None,
            error: None,
        }
    }
}

/// WMS 1.3.0 GetCapabilities. Collects layer names three levels down.
pub async fn wms_get_capabilities(http: &HttpClient, endpoint: &ResolvedEndpoint) -> ProbeOutcome {
    let uri = format!("{}{}", endpoint.uri, WMS_GET_CAPABILITIES_QUERY_ARGS);
    let (mut outcome, document) = execute(http, ProbeKind::WmsGetCapabilities, uri).await;

    if let Some(root) = document {
        outcome.layer_names = layer_names(&root);
        if outcome.layer_names.is_empty() {
            error!(uri = %outcome.uri, "GetCapabilities yielded no layer names");
        }
    }
    outcome
}

/// WMS GetMap for `layer` over the whole globe. Only the status is checked.
pub async fn wms_get_map(http: &HttpClient, endpoint: &ResolvedEndpoint, layer: &str) -> ProbeOutcome {
    let uri = format!("{}{}", endpoint.uri, wms_get_map_query_args(layer));
    execute(http, ProbeKind::WmsGetMap, uri).await.0
}

/// WCS 1.0.0 GetCapabilities.
pub async fn wcs_get_capabilities(http: &HttpClient, endpoint: &ResolvedEndpoint) -> ProbeOutcome {
    let uri = format!("{}{}", endpoint.uri, WCS_GET_CAPABILITIES_QUERY_ARGS);
    execute(http, ProbeKind::WcsGetCapabilities, uri).await.0
}

/// WCS 1.0.0 DescribeCoverage, without naming a coverage.
pub async fn wcs_describe_coverage(http: &HttpClient, endpoint: &ResolvedEndpoint) -> ProbeOutcome {
    let uri = format!("{}{}", endpoint.uri, WCS_DESCRIBE_COVERAGE_QUERY_ARGS);
    execute(http, ProbeKind::WcsDescribeCoverage, uri).await.0
}

/// `Capability/Layer/Layer/Layer/Name` texts, in document order.
pub fn layer_names(capabilities: &XmlElement) -> Vec<String> {
    capabilities
        .find_all(&[CAPABILITY, LAYER, LAYER, LAYER, NAME])
        .into_iter()
        .map(|e| e.text().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Issue the request and classify it. The parsed body is returned only for
/// XML probes that passed.
async fn execute(
    http: &HttpClient,
    kind: ProbeKind,
    uri: String,
) -> (ProbeOutcome, Option<XmlElement>) {
    let mut outcome = ProbeOutcome::new(kind, uri);

    let response = match http.get(&outcome.uri).await {
        Ok(response) => response,
        Err(e) => {
            error!(probe = %kind, uri = %outcome.uri, error = %e, "{} request failed", kind);
            outcome.error = Some(e.to_string());
            return (outcome, None);
        }
    };
    outcome.status = Some(response.status);

    if !response.is_success() {
        fail_with_body(&mut outcome, &response, format!("HTTP {}", response.status));
        return (outcome, None);
    }

    if !kind.expects_xml() {
        info!(probe = %kind, uri = %outcome.uri, status = response.status, "{} OK", kind);
        outcome.ok = true;
        return (outcome, None);
    }

    match XmlElement::parse(&response.text()) {
        Ok(root) => {
            info!(probe = %kind, uri = %outcome.uri, status = response.status, "{} OK", kind);
            outcome.ok = true;
            (outcome, Some(root))
        }
        Err(e) => {
            fail_with_body(&mut outcome, &response, format!("malformed XML: {}", e));
            (outcome, None)
        }
    }
}

fn fail_with_body(outcome: &mut ProbeOutcome, response: &HttpResponse, reason: String) {
    let body = response.stripped_body();
    error!(
        probe = %outcome.kind,
        uri = %outcome.uri,
        status = response.status,
        reason = %reason,
        message = %truncate(&body, LOG_BODY_LIMIT),
        "{} failed",
        outcome.kind
    );
    outcome.ok = false;
    outcome.error = Some(reason);
    outcome.body = Some(body);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_names_at_fixed_depth() {
        let xml = r#"<?xml version="1.0"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms">
  <Capability>
    <Layer>
      <Name>root_should_not_count</Name>
      <Layer>
        <Name>group_should_not_count</Name>
        <Layer><Name>analysed_sst</Name></Layer>
        <Layer><Name> sea_ice_fraction </Name></Layer>
        <Layer><Title>no name</Title></Layer>
      </Layer>
    </Layer>
  </Capability>
</WMS_Capabilities>"#;
        let root = XmlElement::parse(xml).unwrap();
        assert_eq!(layer_names(&root), vec!["analysed_sst", "sea_ice_fraction"]);
    }

    #[test]
    fn test_layer_names_require_wms_namespace() {
        let xml = "<WMS_Capabilities><Capability><Layer><Layer><Layer><Name>x</Name>\
                   </Layer></Layer></Layer></Capability></WMS_Capabilities>";
        let root = XmlElement::parse(xml).unwrap();
        assert!(layer_names(&root).is_empty());
    }

    #[test]
    fn test_probe_kind_labels() {
        assert_eq!(ProbeKind::WmsGetMap.to_string(), "WMS GetMap");
        assert_eq!(ProbeKind::WcsDescribeCoverage.to_string(), "WCS DescribeCoverage");
        assert_eq!(ProbeKind::WcsGetCapabilities.protocol(), Protocol::Wcs);
        assert!(!ProbeKind::WmsGetMap.expects_xml());
        assert!(ProbeKind::WcsDescribeCoverage.expects_xml());
    }
}
