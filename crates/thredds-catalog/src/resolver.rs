//! Resolve the live service root for a protocol from a catalogue entry.

use ogc_common::uri;
use ogc_common::{HttpClient, Protocol, ScanResult};
use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::{fetch_and_parse, CatalogueDocument, ServiceDescriptor, ACCESS_DATASET_DEPTH};

/// Absolute service root a protocol probe is issued against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEndpoint {
    pub protocol: Protocol,
    pub uri: String,
}

/// Outcome of resolving one protocol against one catalogue document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedEndpoint),
    /// The catalogue does not offer this protocol.
    NoService,
    /// The service is declared but no access path sits at `dataset/dataset/access`.
    NoAccessPath {
        service: ServiceDescriptor,
        /// Depths where a matching `access` was found instead.
        found_at_depths: Vec<usize>,
    },
}

impl Resolution {
    pub fn endpoint(self) -> Option<ResolvedEndpoint> {
        match self {
            Resolution::Resolved(endpoint) => Some(endpoint),
            _ => None,
        }
    }
}

/// Resolve `protocol` against an already fetched catalogue.
///
/// The endpoint is `authority + service base + access path`, only built when
/// both halves come from `doc`.
pub fn resolve_in(doc: &CatalogueDocument, protocol: Protocol) -> Resolution {
    let service = match doc.find_service_base(protocol) {
        Ok(service) => service,
        Err(e) => {
            debug!(catalogue = %doc.uri(), %protocol, reason = %e, "Protocol not offered");
            return Resolution::NoService;
        }
    };

    match doc.find_access_path(protocol) {
        Ok(access) => {
            let path = format!("{}{}", service.base, access.url_path);
            Resolution::Resolved(ResolvedEndpoint {
                protocol,
                uri: uri::absolute(doc.authority(), &path),
            })
        }
        Err(_) => {
            let found_at_depths = doc.access_depths(protocol);
            warn!(
                catalogue = %doc.uri(),
                %protocol,
                expected_depth = ACCESS_DATASET_DEPTH,
                found_at_depths = ?found_at_depths,
                "Service declared but no access path at the expected dataset nesting"
            );
            Resolution::NoAccessPath {
                service,
                found_at_depths,
            }
        }
    }
}

/// Fetch the entry's own catalogue and resolve `protocol` in it.
///
/// `Ok(None)` means the entry has no endpoint for that protocol; fetch and
/// parse failures are errors.
pub async fn resolve(
    http: &HttpClient,
    entry_uri: &str,
    protocol: Protocol,
) -> ScanResult<Option<ResolvedEndpoint>> {
    let doc = fetch_and_parse(http, entry_uri).await?;
    Ok(resolve_in(&doc, protocol).endpoint())
}
