//! XML fixtures for THREDDS catalogues and OGC service responses.
//!
//! The documents are small but shaped like real TDS 4.x/5.x output so the
//! parsers see the same namespaces and nesting they meet in production.

/// THREDDS InvCatalog 1.0 namespace.
pub const THREDDS_NS: &str = "http://www.unidata.ucar.edu/namespaces/thredds/InvCatalog/v1.0";

/// Top-level catalogue with one `catalogRef` per href, in the given order.
pub fn top_catalogue(hrefs: &[&str]) -> String {
    let refs: String = hrefs
        .iter()
        .enumerate()
        .map(|(i, href)| {
            format!(
                "  <catalogRef xlink:href=\"{}\" xlink:title=\"entry {}\" name=\"\"/>\n",
                href, i
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<catalog xmlns="{}" xmlns:xlink="http://www.w3.org/1999/xlink" name="Test TDS" version="1.0.1">
{}</catalog>
"#,
        THREDDS_NS, refs
    )
}

/// Entry catalogue declaring WMS and WCS services with one nested dataset
/// exposing both at `url_path`.
pub fn entry_catalogue(url_path: &str) -> String {
    entry_catalogue_with(
        &[("WMS", "/thredds/wms/"), ("WCS", "/thredds/wcs/")],
        &[("wms", url_path), ("wcs", url_path)],
    )
}

/// Entry catalogue with explicit `(serviceType, base)` services and
/// `(serviceName, urlPath)` accesses placed at `dataset/dataset/access`.
pub fn entry_catalogue_with(services: &[(&str, &str)], accesses: &[(&str, &str)]) -> String {
    let services: String = services
        .iter()
        .map(|(service_type, base)| {
            format!(
                "  <service name=\"{}\" serviceType=\"{}\" base=\"{}\"/>\n",
                service_type.to_lowercase(),
                service_type,
                base
            )
        })
        .collect();
    let accesses: String = accesses
        .iter()
        .map(|(name, path)| {
            format!(
                "      <access serviceName=\"{}\" urlPath=\"{}\"/>\n",
                name, path
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<catalog xmlns="{}" xmlns:xlink="http://www.w3.org/1999/xlink" version="1.0.1">
{}  <dataset name="collection">
    <dataset name="aggregation" ID="agg">
{}    </dataset>
  </dataset>
</catalog>
"#,
        THREDDS_NS, services, accesses
    )
}

/// WMS 1.3.0 capabilities listing `layers` at `Capability/Layer/Layer/Layer/Name`.
pub fn wms_capabilities(layers: &[&str]) -> String {
    let layers: String = layers
        .iter()
        .map(|name| {
            format!(
                "        <Layer queryable=\"1\">\n          <Name>{}</Name>\n          <Title>{}</Title>\n        </Layer>\n",
                name, name
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms" xmlns:xlink="http://www.w3.org/1999/xlink">
  <Service>
    <Name>WMS</Name>
    <Title>Test WMS</Title>
  </Service>
  <Capability>
    <Layer>
      <Title>Root</Title>
      <Layer>
        <Title>Dataset</Title>
{}      </Layer>
    </Layer>
  </Capability>
</WMS_Capabilities>
"#,
        layers
    )
}

/// Minimal WCS 1.0.0 capabilities document.
pub fn wcs_capabilities() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<WCS_Capabilities version="1.0.0" xmlns="http://www.opengis.net/wcs" xmlns:gml="http://www.opengis.net/gml">
  <Service><name>WCS</name><label>Test WCS</label></Service>
  <ContentMetadata>
    <CoverageOfferingBrief><name>sst</name><label>sea surface temperature</label></CoverageOfferingBrief>
  </ContentMetadata>
</WCS_Capabilities>
"#
    .to_string()
}

/// Minimal WCS 1.0.0 DescribeCoverage document.
pub fn wcs_describe_coverage() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<CoverageDescription version="1.0.0" xmlns="http://www.opengis.net/wcs">
  <CoverageOffering><name>sst</name><label>sea surface temperature</label></CoverageOffering>
</CoverageDescription>
"#
    .to_string()
}

/// An OGC service exception report, as returned with HTTP 4xx/5xx.
pub fn service_exception(message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\r\n<ServiceExceptionReport version=\"1.3.0\" xmlns=\"http://www.opengis.net/ogc\">\r\n  <ServiceException>{}</ServiceException>\r\n</ServiceExceptionReport>\r\n",
        message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_catalogue_keeps_order() {
        let xml = top_catalogue(&["b/catalog.xml", "a/catalog.xml"]);
        let b = xml.find("b/catalog.xml").unwrap();
        let a = xml.find("a/catalog.xml").unwrap();
        assert!(b < a);
    }

    #[test]
    fn test_entry_catalogue_contains_both_services() {
        let xml = entry_catalogue("esacci/sst");
        assert!(xml.contains("serviceType=\"WMS\""));
        assert!(xml.contains("serviceType=\"WCS\""));
        assert_eq!(xml.matches("urlPath=\"esacci/sst\"").count(), 2);
    }
}
