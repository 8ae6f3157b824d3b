//! Tests for composing catalogue and endpoint URIs end to end.

use ogc_common::uri::{absolute, authority, directory, entry_uri};

// ============================================================================
// Catalogue prefix derivation
// ============================================================================

#[test]
fn test_prefixes_from_top_level_catalogue() {
    let catalogue = "https://data.example.ac.uk/thredds/esacci/catalog.xml";
    assert_eq!(authority(catalogue), "https://data.example.ac.uk");
    assert_eq!(directory(catalogue), "https://data.example.ac.uk/thredds/esacci");
}

#[test]
fn test_prefixes_keep_port() {
    let catalogue = "http://127.0.0.1:40123/thredds/catalog.xml";
    assert_eq!(authority(catalogue), "http://127.0.0.1:40123");
    assert_eq!(directory(catalogue), "http://127.0.0.1:40123/thredds");
}

// ============================================================================
// Endpoint composition
// ============================================================================

#[test]
fn test_service_endpoint_composition() {
    let catalogue = "https://data.example.ac.uk/thredds/esacci/catalog.xml";
    let entry = entry_uri(directory(catalogue), "esacci.SST.v2/catalog.xml");
    assert_eq!(
        entry,
        "https://data.example.ac.uk/thredds/esacci/esacci.SST.v2/catalog.xml"
    );

    let endpoint = absolute(authority(&entry), &format!("{}{}", "/thredds/wms/", "esacci.SST.v2"));
    assert_eq!(endpoint, "https://data.example.ac.uk/thredds/wms/esacci.SST.v2");
}

#[test]
fn test_uri_without_scheme_is_not_rejected() {
    // Composition never validates; the HTTP layer is where this fails.
    assert_eq!(authority("not-a-uri/path"), "not-a-uri");
    assert_eq!(entry_uri(directory("not-a-uri/path/c.xml"), "x.xml"), "not-a-uri/path/x.xml");
}
