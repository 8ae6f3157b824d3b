//! OGC protocols advertised by THREDDS catalogues.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// OGC service protocols the scanner knows how to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Web Map Service
    Wms,
    /// Web Coverage Service
    Wcs,
}

impl Protocol {
    pub const ALL: [Protocol; 2] = [Protocol::Wms, Protocol::Wcs];

    /// Value of the `serviceType` attribute on a catalogue `service` element.
    pub fn service_type(&self) -> &'static str {
        match self {
            Protocol::Wms => "WMS",
            Protocol::Wcs => "WCS",
        }
    }

    /// Value of the `serviceName` attribute on a dataset `access` element.
    pub fn service_name(&self) -> &'static str {
        match self {
            Protocol::Wms => "wms",
            Protocol::Wcs => "wcs",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.service_type())
    }
}

/// Error parsing a protocol name.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unsupported protocol: {0} (expected wms or wcs)")]
pub struct ProtocolParseError(pub String);

impl FromStr for Protocol {
    type Err = ProtocolParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wms" => Ok(Protocol::Wms),
            "wcs" => Ok(Protocol::Wcs),
            _ => Err(ProtocolParseError(s.to_string())),
        }
    }
}
