//! Catalogue fetching and endpoint resolution over HTTP.

use std::time::{Duration, Instant};

use ogc_common::{HttpClient, Protocol, ScanError};
use test_utils::{fixtures, StubResponse, StubServer};
use thredds_catalog::{fetch_and_parse, resolve, CatalogueDocument};

fn client() -> HttpClient {
    HttpClient::new(Duration::from_secs(5)).unwrap()
}

// ============================================================================
// Top-level listing
// ============================================================================

#[tokio::test]
async fn test_lists_every_reference_in_document_order() {
    let server = StubServer::start().await;
    let hrefs = ["c/catalog.xml", "a/catalog.xml", "b/catalog.xml", "d/catalog.xml"];
    let uri = server.mount_top_catalogue(&hrefs);

    let doc = fetch_and_parse(&client(), &uri).await.unwrap();

    let refs: Vec<String> = doc
        .catalogue_references()
        .into_iter()
        .map(|r| r.href)
        .collect();
    assert_eq!(refs, hrefs);
    assert_eq!(
        doc.entry_uris(),
        hrefs
            .iter()
            .map(|h| server.url(&format!("/thredds/{}", h)))
            .collect::<Vec<_>>()
    );
}

#[test]
fn test_empty_catalogue_has_no_references() {
    let doc = CatalogueDocument::parse(
        "http://h/thredds/catalog.xml",
        &fixtures::top_catalogue(&[]),
    )
    .unwrap();
    assert!(doc.catalogue_references().is_empty());
}

// ============================================================================
// Fetch failures
// ============================================================================

#[tokio::test]
async fn test_missing_catalogue_is_fetch_error() {
    let server = StubServer::start().await;

    let err = fetch_and_parse(&client(), &server.url("/thredds/none.xml"))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn test_malformed_catalogue() {
    let server = StubServer::start().await;
    server.respond(
        "/thredds/catalog.xml",
        StubResponse::xml(200, "<catalog><dataset></catalog>"),
    );

    let err = fetch_and_parse(&client(), &server.url("/thredds/catalog.xml"))
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::MalformedDocument { .. }));
}

#[tokio::test]
async fn test_unreachable_host_is_fetch_error_without_status() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let uri = format!("http://127.0.0.1:{}/thredds/catalog.xml", port);

    let err = fetch_and_parse(&client(), &uri).await.unwrap_err();

    assert!(matches!(err, ScanError::Fetch { status: None, .. }));
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _accepting = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    let http = HttpClient::new(Duration::from_secs(1)).unwrap();
    let uri = format!("http://{}/thredds/catalog.xml", addr);

    let started = Instant::now();
    let err = fetch_and_parse(&http, &uri).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(5));
    match err {
        ScanError::Fetch { status, message, .. } => {
            assert_eq!(status, None);
            assert!(message.contains("timed out"), "message: {}", message);
        }
        other => panic!("expected fetch error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_deeply_nested_catalogue_is_malformed() {
    let server = StubServer::start().await;
    let n = 100_000;
    server.respond(
        "/thredds/catalog.xml",
        StubResponse::xml(200, format!("{}{}", "<a>".repeat(n), "</a>".repeat(n))),
    );

    let err = fetch_and_parse(&client(), &server.url("/thredds/catalog.xml"))
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::MalformedDocument { .. }));
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn test_resolve_both_protocols() {
    let server = StubServer::start().await;
    let href = server.mount_entry("esacci/sst", &["analysed_sst"]);
    let entry = server.url(&format!("/thredds/{}", href));
    let http = client();

    let wms = resolve(&http, &entry, Protocol::Wms).await.unwrap().unwrap();
    let wcs = resolve(&http, &entry, Protocol::Wcs).await.unwrap().unwrap();

    assert_eq!(wms.uri, server.url("/thredds/wms/esacci/sst"));
    assert_eq!(wcs.uri, server.url("/thredds/wcs/esacci/sst"));
    assert_eq!(wcs.protocol, Protocol::Wcs);
}

#[tokio::test]
async fn test_resolve_absent_protocol() {
    let server = StubServer::start().await;
    server.respond(
        "/thredds/wmsonly/catalog.xml",
        StubResponse::xml(
            200,
            fixtures::entry_catalogue_with(&[("WMS", "/thredds/wms/")], &[("wms", "wmsonly")]),
        ),
    );
    let entry = server.url("/thredds/wmsonly/catalog.xml");

    let wcs = resolve(&client(), &entry, Protocol::Wcs).await.unwrap();
    assert!(wcs.is_none());
}

#[tokio::test]
async fn test_resolve_fetches_entry_catalogue_each_time() {
    let server = StubServer::start().await;
    let href = server.mount_entry("x", &[]);
    let entry = server.url(&format!("/thredds/{}", href));
    let http = client();

    resolve(&http, &entry, Protocol::Wms).await.unwrap();
    resolve(&http, &entry, Protocol::Wcs).await.unwrap();

    let fetches = server
        .hits()
        .iter()
        .filter(|h| h.as_str() == "/thredds/x/catalog.xml")
        .count();
    assert_eq!(fetches, 2);
}
