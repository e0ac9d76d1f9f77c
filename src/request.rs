//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::{Extensions, HeaderMap};

use crate::cookie::CookieJar;
use crate::method::{Method, UnknownMethod};
use crate::session::Session;
use crate::util;

/// An incoming HTTP request with its body fully buffered.
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    pub(crate) params: HashMap<String, String>,
    remote_addr: Option<SocketAddr>,
    extensions: Extensions,
}

impl Request {
    /// Builds a request from an `http::Request` whose body is already in memory.
    ///
    /// This is what the server does for every connection; tests use it to
    /// drive an [`App`](crate::App) without a socket.
    pub fn from_http(req: http::Request<Bytes>) -> Result<Self, UnknownMethod> {
        let (parts, body) = req.into_parts();
        let method = Method::try_from(&parts.method)?;
        Ok(Self {
            method,
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().map(str::to_owned),
            headers: parts.headers,
            body,
            params: HashMap::new(),
            remote_addr: None,
            extensions: parts.extensions,
        })
    }

    pub(crate) fn set_remote_addr(&mut self, addr: SocketAddr) {
        self.remote_addr = Some(addr);
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// Path plus query string, as the client requested it.
    pub fn url(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    /// Case-insensitive header lookup. Non-UTF-8 values are treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// First value of a query-string parameter, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// A query-string parameter parsed as an integer.
    pub fn query_int(&self, name: &str) -> Option<i64> {
        self.query_param(name).as_deref().and_then(util::to_int)
    }

    /// The body decoded as `application/x-www-form-urlencoded` pairs.
    pub fn form(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(&self.body)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// The media type the client prefers most, judged by the `q` weights in
    /// `Accept`. The earliest entry wins a tie.
    pub fn chief_accept(&self) -> Option<String> {
        let accept = self.header("accept")?;
        let mut best: Option<(&str, f32)> = None;
        for entry in accept.split(',') {
            let mut parts = entry.split(';');
            let media = parts.next().unwrap_or("").trim();
            if media.is_empty() {
                continue;
            }
            let q = parts
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|v| v.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            if best.is_none_or(|(_, top)| q > top) {
                best = Some((media, q));
            }
        }
        best.map(|(media, _)| media.to_ascii_lowercase())
    }

    /// The cookie jar installed by the [`Cookies`](crate::middleware::Cookies) middleware.
    pub fn cookies(&self) -> Option<&CookieJar> {
        self.extensions.get::<CookieJar>()
    }

    /// The session installed by the [`Sessions`](crate::middleware::Sessions) middleware.
    pub fn session(&self) -> Option<&Session> {
        self.extensions.get::<Session>()
    }

    /// Shared state registered with [`App::extension`](crate::App::extension).
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}
