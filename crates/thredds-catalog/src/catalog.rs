//! THREDDS InvCatalog document model and queries.

use ogc_common::uri;
use ogc_common::{
    HttpClient, Protocol, QName, ScanError, ScanResult, XmlElement, THREDDS_NS, XLINK_NS,
};
use serde::Serialize;
use tracing::{instrument, warn};

const CATALOG_REF: QName = QName::ns(THREDDS_NS, "catalogRef");
const SERVICE: QName = QName::ns(THREDDS_NS, "service");
const DATASET: QName = QName::ns(THREDDS_NS, "dataset");
const ACCESS: QName = QName::ns(THREDDS_NS, "access");

const XLINK_HREF: QName = QName::ns(XLINK_NS, "href");
const XLINK_TITLE: QName = QName::ns(XLINK_NS, "title");
const SERVICE_TYPE: QName = QName::local("serviceType");
const SERVICE_NAME: QName = QName::local("serviceName");
const NAME: QName = QName::local("name");
const BASE: QName = QName::local("base");
const URL_PATH: QName = QName::local("urlPath");

/// Number of `dataset` levels an `access` element is expected under.
pub const ACCESS_DATASET_DEPTH: usize = 2;

/// Reference to a child catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogueReference {
    /// Raw `xlink:href` value, usually relative to the parent catalogue.
    pub href: String,
    pub title: Option<String>,
}

/// A `service` declaration for one protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDescriptor {
    pub protocol: Protocol,
    pub name: Option<String>,
    pub base: String,
}

/// Per-dataset path for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessPath {
    pub service_name: String,
    pub url_path: String,
}

/// A parsed catalogue together with the URI it came from.
#[derive(Debug, Clone)]
pub struct CatalogueDocument {
    uri: String,
    root: XmlElement,
}

/// GET a catalogue and parse it.
///
/// Non-2xx responses and transport failures are `ScanError::Fetch`; a body
/// that is not well-formed XML is `ScanError::MalformedDocument`.
#[instrument(skip(http))]
pub async fn fetch_and_parse(http: &HttpClient, uri: &str) -> ScanResult<CatalogueDocument> {
    let response = http.get_ok(uri).await?;
    CatalogueDocument::parse(uri, &response.text())
}

impl CatalogueDocument {
    pub fn parse(uri: impl Into<String>, xml: &str) -> ScanResult<Self> {
        let uri = uri.into();
        let root = XmlElement::parse(xml).map_err(|e| ScanError::malformed(uri.clone(), e))?;
        Ok(Self { uri, root })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// Scheme and host of the catalogue URI.
    pub fn authority(&self) -> &str {
        uri::authority(&self.uri)
    }

    /// All top-level `catalogRef` children, in document order.
    pub fn catalogue_references(&self) -> Vec<CatalogueReference> {
        self.root
            .children_named(CATALOG_REF)
            .filter_map(|e| match e.attribute(XLINK_HREF) {
                Some(href) => Some(CatalogueReference {
                    href: href.to_string(),
                    title: e.attribute(XLINK_TITLE).map(str::to_string),
                }),
                None => {
                    warn!(catalogue = %self.uri, "catalogRef without xlink:href ignored");
                    None
                }
            })
            .collect()
    }

    /// Absolute URIs of every child catalogue, in document order.
    pub fn entry_uris(&self) -> Vec<String> {
        let dir = uri::directory(&self.uri);
        self.catalogue_references()
            .iter()
            .map(|r| uri::entry_uri(dir, &r.href))
            .collect()
    }

    /// First `service` whose `serviceType` matches `protocol`.
    ///
    /// Services nested in a compound service are searched in document order.
    pub fn find_service_base(&self, protocol: Protocol) -> ScanResult<ServiceDescriptor> {
        let mut services = Vec::new();
        for service in self.root.children_named(SERVICE) {
            collect_services(service, &mut services);
        }

        let service = services
            .into_iter()
            .find(|s| {
                s.attribute(SERVICE_TYPE)
                    .is_some_and(|t| t.eq_ignore_ascii_case(protocol.service_type()))
            })
            .ok_or_else(|| {
                ScanError::NotFound(format!(
                    "no {} service declared in {}",
                    protocol, self.uri
                ))
            })?;

        // Only the first match counts, even when it lacks a base.
        let base = service.attribute(BASE).ok_or_else(|| {
            ScanError::NotFound(format!(
                "{} service in {} has no base attribute",
                protocol, self.uri
            ))
        })?;
        Ok(ServiceDescriptor {
            protocol,
            name: service.attribute(NAME).map(str::to_string),
            base: base.to_string(),
        })
    }

    /// First `dataset/dataset/access` whose `serviceName` matches `protocol`.
    ///
    /// Only that exact nesting is searched; other layouts are `NotFound`.
    pub fn find_access_path(&self, protocol: Protocol) -> ScanResult<AccessPath> {
        self.root
            .find_all(&[DATASET, DATASET, ACCESS])
            .into_iter()
            .find_map(|a| access_for(a, protocol))
            .ok_or_else(|| {
                ScanError::NotFound(format!(
                    "no dataset/dataset/access for service {} in {}",
                    protocol.service_name(),
                    self.uri
                ))
            })
    }

    /// Dataset nesting depths at which a matching `access` does exist.
    ///
    /// Used to explain a `find_access_path` miss to the operator.
    pub fn access_depths(&self, protocol: Protocol) -> Vec<usize> {
        let mut depths = Vec::new();
        collect_access_depths(&self.root, 0, protocol, &mut depths);
        depths.sort_unstable();
        depths.dedup();
        depths
    }
}

fn collect_services<'a>(service: &'a XmlElement, out: &mut Vec<&'a XmlElement>) {
    out.push(service);
    for nested in service.children_named(SERVICE) {
        collect_services(nested, out);
    }
}

fn access_for(access: &XmlElement, protocol: Protocol) -> Option<AccessPath> {
    let service_name = access.attribute(SERVICE_NAME)?;
    if !service_name.eq_ignore_ascii_case(protocol.service_name()) {
        return None;
    }
    Some(AccessPath {
        service_name: service_name.to_string(),
        url_path: access.attribute(URL_PATH)?.to_string(),
    })
}

fn collect_access_depths(
    element: &XmlElement,
    depth: usize,
    protocol: Protocol,
    out: &mut Vec<usize>,
) {
    if depth > 0 && element.children_named(ACCESS).any(|a| access_for(a, protocol).is_some()) {
        out.push(depth);
    }
    for dataset in element.children_named(DATASET) {
        collect_access_depths(dataset, depth + 1, protocol, out);
    }
}
