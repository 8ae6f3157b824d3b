//! In-process HTTP stub standing in for a THREDDS data server.
//!
//! Responses are registered per path, optionally narrowed by the value of
//! the OGC `request` query parameter, so one service root can answer
//! GetCapabilities and GetMap differently. Every request is recorded.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::fixtures;

/// Canned response for one route.
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    /// Held back this long before answering.
    pub delay: Option<Duration>,
}

impl StubResponse {
    pub fn xml(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/xml",
            body: body.into(),
            delay: None,
        }
    }

    /// Answer only after `delay`, to push a client past its timeout.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type RouteKey = (String, Option<String>);

#[derive(Default)]
struct StubState {
    routes: Mutex<HashMap<RouteKey, StubResponse>>,
    hits: Mutex<Vec<String>>,
}

/// A running stub server bound to an ephemeral localhost port.
pub struct StubServer {
    addr: SocketAddr,
    state: Arc<StubState>,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start() -> Self {
        let state = Arc::new(StubState::default());
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub listener address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub server");
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// `http://127.0.0.1:<port>`
    pub fn authority(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Absolute URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.authority(), path)
    }

    /// Answer every request to `path` regardless of query.
    pub fn respond(&self, path: &str, response: StubResponse) {
        self.insert((path.to_string(), None), response);
    }

    /// Answer requests to `path` whose `request=` parameter equals `request`
    /// (case-insensitive). Takes precedence over [`StubServer::respond`].
    pub fn respond_to(&self, path: &str, request: &str, response: StubResponse) {
        self.insert((path.to_string(), Some(request.to_lowercase())), response);
    }

    fn insert(&self, key: RouteKey, response: StubResponse) {
        self.state
            .routes
            .lock()
            .expect("stub routes lock")
            .insert(key, response);
    }

    /// Every request seen so far as `path?query`, in arrival order.
    pub fn hits(&self) -> Vec<String> {
        self.state.hits.lock().expect("stub hits lock").clone()
    }

    /// Number of requests whose `request=` parameter equals `request`.
    pub fn request_count(&self, path: &str, request: &str) -> usize {
        self.hits()
            .iter()
            .filter(|hit| {
                let (hit_path, query) = hit.split_once('?').unwrap_or((hit.as_str(), ""));
                hit_path == path
                    && request_param(query).as_deref() == Some(request.to_lowercase().as_str())
            })
            .count()
    }

    /// Mount a complete healthy entry named `name`.
    ///
    /// Serves `/thredds/{name}/catalog.xml` with WMS and WCS services whose
    /// roots are `/thredds/wms/{name}` and `/thredds/wcs/{name}`; both roots
    /// answer every probe with 200 and WMS lists `layers`. Returns the
    /// `catalogRef` href to put in the top-level catalogue.
    pub fn mount_entry(&self, name: &str, layers: &[&str]) -> String {
        self.respond(
            &format!("/thredds/{}/catalog.xml", name),
            StubResponse::xml(200, fixtures::entry_catalogue(name)),
        );

        let wms = format!("/thredds/wms/{}", name);
        self.respond_to(
            &wms,
            "GetCapabilities",
            StubResponse::xml(200, fixtures::wms_capabilities(layers)),
        );
        self.respond_to(
            &wms,
            "GetMap",
            StubResponse {
                status: 200,
                content_type: "image/png",
                body: "\u{89}PNG".to_string(),
                delay: None,
            },
        );

        let wcs = format!("/thredds/wcs/{}", name);
        self.respond_to(
            &wcs,
            "GetCapabilities",
            StubResponse::xml(200, fixtures::wcs_capabilities()),
        );
        self.respond_to(
            &wcs,
            "DescribeCoverage",
            StubResponse::xml(200, fixtures::wcs_describe_coverage()),
        );

        format!("{}/catalog.xml", name)
    }

    /// Serve a top-level catalogue at `/thredds/catalog.xml` and return its URL.
    pub fn mount_top_catalogue(&self, hrefs: &[&str]) -> String {
        let path = "/thredds/catalog.xml";
        self.respond(path, StubResponse::xml(200, fixtures::top_catalogue(hrefs)));
        self.url(path)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn request_param(query: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        key.eq_ignore_ascii_case("request")
            .then(|| value.to_lowercase())
    })
}

async fn handle(State(state): State<Arc<StubState>>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    let request = uri.query().and_then(request_param);

    state
        .hits
        .lock()
        .expect("stub hits lock")
        .push(match uri.query() {
            Some(q) => format!("{}?{}", path, q),
            None => path.clone(),
        });

    let found = {
        let routes = state.routes.lock().expect("stub routes lock");
        request
            .and_then(|r| routes.get(&(path.clone(), Some(r))).cloned())
            .or_else(|| routes.get(&(path, None)).cloned())
    };

    if let Some(delay) = found.as_ref().and_then(|r| r.delay) {
        tokio::time::sleep(delay).await;
    }

    match found {
        Some(r) => (
            StatusCode::from_u16(r.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            [(header::CONTENT_TYPE, r.content_type)],
            r.body,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "no stub registered").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_param_is_case_insensitive() {
        assert_eq!(
            request_param("service=WMS&REQUEST=GetMap&x=1").as_deref(),
            Some("getmap")
        );
        assert_eq!(request_param("service=WMS"), None);
        assert_eq!(request_param(""), None);
    }

    #[tokio::test]
    async fn test_routes_by_request_parameter() {
        let server = StubServer::start().await;
        server.respond("/svc", StubResponse::xml(500, "fallback"));
        server.respond_to("/svc", "GetCapabilities", StubResponse::xml(200, "<ok/>"));

        let caps = reqwest::get(server.url("/svc?request=GetCapabilities"))
            .await
            .unwrap();
        assert_eq!(caps.status().as_u16(), 200);
        assert_eq!(caps.text().await.unwrap(), "<ok/>");

        let other = reqwest::get(server.url("/svc?request=GetMap")).await.unwrap();
        assert_eq!(other.status().as_u16(), 500);

        let missing = reqwest::get(server.url("/nothing")).await.unwrap();
        assert_eq!(missing.status().as_u16(), 404);

        assert_eq!(server.hits().len(), 3);
        assert_eq!(server.request_count("/svc", "getcapabilities"), 1);
    }
}
