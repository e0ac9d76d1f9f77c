//! End-to-end behaviour of the default middleware stack, driven in-process.

use std::sync::Arc;

use bytes::Bytes;
use drape::config::Config;
use drape::session::MemoryStore;
use drape::{App, Error, HttpError, Request, Response, Router, Status, post_only};

async fn hello(_req: Request) -> Response {
    Response::status(Status::Ok)
}

async fn needs_int(req: Request) -> drape::Result<Response> {
    let page = req
        .query_int("page")
        .ok_or_else(|| HttpError::bad_request("page", "must be an integer"))?;
    Ok(Response::text(format!("page {page}")))
}

async fn explode(_req: Request) -> drape::Result<Response> {
    Err(Error::other("backend unavailable"))
}

async fn count(req: Request) -> drape::Result<Response> {
    let session = req.session().ok_or_else(|| Error::other("no session"))?;
    let n = session.get::<u32>("n").unwrap_or(0) + 1;
    session.set("n", &n)?;
    if let Some(jar) = req.cookies() {
        jar.set("last", &n.to_string());
    }
    Ok(Response::text(n.to_string()))
}

async fn logout(req: Request) -> Response {
    if let Some(session) = req.session() {
        session.destroy();
    }
    Response::status(Status::NoContent)
}

async fn upload(_req: Request) -> &'static str {
    "stored"
}

fn app(debug: bool) -> App {
    let config = Config::default()
        .merged(serde_json::json!({ "debug": debug }))
        .unwrap();
    let router = Router::new()
        .get("/", hello)
        .get("/list", needs_int)
        .get("/explode", explode)
        .get("/count", count)
        .post("/logout", logout)
        .get("/upload", post_only(upload))
        .post("/upload", post_only(upload));
    App::with_session_store(router, &config, Arc::new(MemoryStore::new()))
}

fn request(method: &str, uri: &str, headers: &[(&str, &str)]) -> Request {
    let mut builder = http::Request::builder().method(method).uri(uri);
    for (k, v) in headers {
        builder = builder.header(*k, *v);
    }
    Request::from_http(builder.body(Bytes::new()).unwrap()).unwrap()
}

fn session_cookie(rsp: &Response) -> Option<String> {
    rsp.header_all("set-cookie")
        .find(|c| c.starts_with("DRAPESESSID="))
        .and_then(|c| c.split(';').next())
        .map(str::to_owned)
}

#[tokio::test]
async fn plain_response_gets_default_headers() {
    let rsp = app(false).handle(request("GET", "/", &[])).await;
    assert_eq!(rsp.status_code(), Status::Ok);
    assert_eq!(rsp.header("content-type"), Some("text/html; charset=utf-8"));
    assert!(rsp.header("x-powered-by").unwrap().starts_with("drape/"));
}

#[tokio::test]
async fn unknown_route_is_404_text() {
    let rsp = app(false).handle(request("GET", "/missing?x=1", &[])).await;
    assert_eq!(rsp.status_code(), Status::NotFound);
    assert_eq!(rsp.header("content-type"), Some("text/plain; charset=utf-8"));
    assert_eq!(rsp.body(), b"can not found: /missing");
    // Error responses still pass through the outer layers.
    assert!(rsp.has_header("x-powered-by"));
}

#[tokio::test]
async fn bad_request_is_json_for_json_clients() {
    let rsp = app(false)
        .handle(request("GET", "/list?page=abc", &[("accept", "application/json")]))
        .await;
    assert_eq!(rsp.status_code(), Status::BadRequest);
    assert_eq!(rsp.header("content-type"), Some("application/json"));
    assert_eq!(rsp.body(), br#""page invalid: must be an integer""#);

    let ok = app(false).handle(request("GET", "/list?page=3", &[])).await;
    assert_eq!(ok.body(), b"page 3");
}

#[tokio::test]
async fn post_only_rejects_other_methods() {
    let app = app(false);
    let rsp = app.handle(request("GET", "/upload", &[])).await;
    assert_eq!(rsp.status_code(), Status::MethodNotAllowed);
    assert_eq!(rsp.body(), b"405 Method Not Allowed");

    let rsp = app.handle(request("POST", "/upload", &[])).await;
    assert_eq!(rsp.body(), b"stored");
}

#[tokio::test]
async fn internal_errors_are_hidden_unless_debugging() {
    let rsp = app(false).handle(request("GET", "/explode", &[])).await;
    assert_eq!(rsp.status_code(), Status::InternalServerError);
    assert_eq!(rsp.body(), b"500 Internal Server Error");

    let rsp = app(true).handle(request("GET", "/explode", &[("user-agent", "tests")])).await;
    let body = String::from_utf8(rsp.body().to_vec()).unwrap();
    assert!(body.starts_with("url: /explode\nbackend unavailable\nenviron:\n"), "{body}");
    assert!(body.contains("HTTP_USER_AGENT => tests\n"));
}

#[tokio::test]
async fn session_counts_across_requests_and_can_be_destroyed() {
    let app = app(false);

    let first = app.handle(request("GET", "/count", &[])).await;
    assert_eq!(first.body(), b"1");
    let cookie = session_cookie(&first).expect("session cookie issued");
    assert!(first.header_all("set-cookie").any(|c| c == "last=1; Path=/"));

    let second = app.handle(request("GET", "/count", &[("cookie", cookie.as_str())])).await;
    assert_eq!(second.body(), b"2");
    // Same id, re-sent so the browser's expiry keeps pace with the store's.
    assert_eq!(session_cookie(&second).as_deref(), Some(cookie.as_str()));
    assert!(second.header_all("set-cookie").any(|c| c.starts_with("DRAPESESSID=") && c.contains("Max-Age=3600")));

    let bye = app.handle(request("POST", "/logout", &[("cookie", cookie.as_str())])).await;
    assert_eq!(bye.status_code(), Status::NoContent);
    let cleared = bye.header_all("set-cookie").find(|c| c.starts_with("DRAPESESSID=")).unwrap();
    assert!(cleared.contains("Max-Age=0"));

    let fresh = app.handle(request("GET", "/count", &[("cookie", cookie.as_str())])).await;
    assert_eq!(fresh.body(), b"1");
    assert_ne!(session_cookie(&fresh), Some(cookie));
}
