//! URI composition for catalogue references and service endpoints.
//!
//! Composition is plain string work. Nothing here validates URI grammar;
//! a malformed input yields a malformed URI that fails at the HTTP layer.

/// Scheme and host (with port) of `uri`, without any path.
///
/// `https://tds.example.org:8443/thredds/catalog.xml` gives
/// `https://tds.example.org:8443`.
pub fn authority(uri: &str) -> &str {
    let host_start = uri.find("://").map(|i| i + 3).unwrap_or(0);
    let host_end = uri[host_start..]
        .find(&['/', '?', '#'][..])
        .map(|i| host_start + i)
        .unwrap_or(uri.len());
    &uri[..host_end]
}

/// Authority plus the directory part of the path, with no trailing slash.
///
/// `http://h/thredds/catalog.xml?x=1` gives `http://h/thredds`.
pub fn directory(uri: &str) -> &str {
    let auth = authority(uri);
    let rest = &uri[auth.len()..];
    let path_end = rest.find(&['?', '#'][..]).unwrap_or(rest.len());
    let path = &rest[..path_end];
    let dir_len = path.rfind('/').unwrap_or(0);
    &uri[..auth.len() + dir_len]
}

/// Concatenate an authority with a relative or path-qualified fragment.
pub fn absolute(base_authority: &str, relative: &str) -> String {
    format!("{}{}", base_authority, relative)
}

/// Absolute URI of a `catalogRef` target.
///
/// Absolute `http(s)` hrefs are used as-is, `/`-rooted hrefs attach to the
/// authority, and anything else is taken relative to `catalogue_dir`.
pub fn entry_uri(catalogue_dir: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        absolute(authority(catalogue_dir), href)
    } else {
        format!("{}/{}", catalogue_dir, href)
    }
}
