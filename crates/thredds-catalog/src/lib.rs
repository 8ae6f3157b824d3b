//! THREDDS catalogue parsing and OGC endpoint resolution.
//!
//! Supports:
//! - InvCatalog 1.0 documents (`catalogRef`, `service`, `dataset/dataset/access`)
//! - Resolving a WMS or WCS service root for a catalogue entry

pub mod catalog;
pub mod resolver;

pub use catalog::{
    fetch_and_parse, AccessPath, CatalogueDocument, CatalogueReference, ServiceDescriptor,
};
pub use resolver::{resolve, resolve_in, Resolution, ResolvedEndpoint};
