//! Common types and utilities shared across the tds-ogc-scan workspace.

pub mod error;
pub mod http;
pub mod protocol;
pub mod uri;
pub mod xml;

pub use error::{ScanError, ScanResult};
pub use http::{HttpClient, HttpResponse};
pub use protocol::{Protocol, ProtocolParseError};
pub use xml::{QName, XmlElement, XmlParseError};

/// THREDDS InvCatalog 1.0 namespace.
pub const THREDDS_NS: &str = "http://www.unidata.ucar.edu/namespaces/thredds/InvCatalog/v1.0";

/// XLink namespace used by `catalogRef` hrefs.
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// OGC WMS 1.3.0 namespace.
pub const WMS_NS: &str = "http://www.opengis.net/wms";
