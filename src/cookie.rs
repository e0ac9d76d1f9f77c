//! Request cookies and pending `Set-Cookie` changes.
//!
//! The [`Cookies`](crate::middleware::Cookies) middleware creates one
//! [`CookieJar`] per request, stores it in the request, and flushes every
//! pending change into the response once the inner chain has produced one.
//!
//! ```rust
//! use drape::{CookieJar, CookieOptions, Request, Response};
//!
//! async fn remember(req: Request) -> Response {
//!     if let Some(jar) = req.cookies() {
//!         let visits = jar.get("visits").and_then(|v| v.parse::<u32>().ok()).unwrap_or(0);
//!         jar.set_with("visits", &(visits + 1).to_string(), CookieOptions::default().http_only());
//!     }
//!     Response::text("counted")
//! }
//! ```

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use http::HeaderMap;

use crate::response::Response;
use crate::util::{url_quote, url_unquote};

/// `SameSite` attribute values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// Attributes attached to a `Set-Cookie` header.
#[derive(Clone, Debug)]
pub struct CookieOptions {
    pub path: Option<String>,
    pub domain: Option<String>,
    pub max_age: Option<Duration>,
    pub expires: Option<DateTime<Utc>>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: Some("/".to_owned()),
            domain: None,
            max_age: None,
            expires: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }
}

impl CookieOptions {
    pub fn max_age(mut self, age: Duration) -> Self {
        self.max_age = Some(age);
        self
    }

    pub fn expires(mut self, at: DateTime<Utc>) -> Self {
        self.expires = Some(at);
        self
    }

    pub fn domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_owned());
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_owned());
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }
}

#[derive(Debug)]
struct Pending {
    name: String,
    // `None` means removal.
    value: Option<String>,
    options: CookieOptions,
}

#[derive(Debug, Default)]
struct JarState {
    incoming: HashMap<String, String>,
    pending: Vec<Pending>,
}

/// Cookies sent by the client plus changes to send back.
///
/// Cloning is cheap; clones share the same jar.
#[derive(Clone, Debug, Default)]
pub struct CookieJar {
    inner: Arc<Mutex<JarState>>,
}

impl CookieJar {
    /// Parses every `Cookie` header. The first occurrence of a name wins.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut incoming = HashMap::new();
        for header in headers.get_all(http::header::COOKIE) {
            let Ok(header) = header.to_str() else { continue };
            for pair in header.split(';') {
                let Some((name, value)) = pair.split_once('=') else { continue };
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                let value = value.trim().trim_matches('"');
                incoming.entry(name.to_owned()).or_insert_with(|| url_unquote(value));
            }
        }
        Self { inner: Arc::new(Mutex::new(JarState { incoming, pending: Vec::new() })) }
    }

    fn state(&self) -> MutexGuard<'_, JarState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current value of a cookie, including changes made during this request.
    pub fn get(&self, name: &str) -> Option<String> {
        let state = self.state();
        if let Some(p) = state.pending.iter().rev().find(|p| p.name == name) {
            return p.value.clone();
        }
        state.incoming.get(name).cloned()
    }

    /// Sets a cookie with default options (`Path=/`).
    pub fn set(&self, name: &str, value: &str) {
        self.set_with(name, value, CookieOptions::default());
    }

    pub fn set_with(&self, name: &str, value: &str, options: CookieOptions) {
        self.push(name, Some(value.to_owned()), options);
    }

    /// Tells the client to drop a cookie.
    pub fn remove(&self, name: &str) {
        self.remove_with(name, CookieOptions::default());
    }

    /// Removal with explicit path/domain, which must match the original cookie.
    pub fn remove_with(&self, name: &str, options: CookieOptions) {
        self.push(name, None, options);
    }

    fn push(&self, name: &str, value: Option<String>, options: CookieOptions) {
        let mut state = self.state();
        state.pending.retain(|p| p.name != name);
        state.pending.push(Pending { name: name.to_owned(), value, options });
    }

    /// Writes one `Set-Cookie` header per pending change into `rsp`.
    pub fn flush(&self, rsp: &mut Response) {
        let pending = std::mem::take(&mut self.state().pending);
        for p in pending {
            rsp.append_header("set-cookie", set_cookie_value(&p));
        }
    }
}

fn set_cookie_value(p: &Pending) -> String {
    let mut out = format!("{}={}", p.name, url_quote(p.value.as_deref().unwrap_or("")));
    let o = &p.options;
    if let Some(path) = &o.path {
        let _ = write!(out, "; Path={path}");
    }
    if let Some(domain) = &o.domain {
        let _ = write!(out, "; Domain={domain}");
    }
    match &p.value {
        None => {
            out.push_str("; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
        }
        Some(_) => {
            if let Some(age) = o.max_age {
                let _ = write!(out, "; Max-Age={}", age.as_secs());
            }
            if let Some(at) = o.expires {
                let _ = write!(out, "; Expires={}", at.format("%a, %d %b %Y %H:%M:%S GMT"));
            }
        }
    }
    if o.secure {
        out.push_str("; Secure");
    }
    if o.http_only {
        out.push_str("; HttpOnly");
    }
    if let Some(same_site) = o.same_site {
        let v = match same_site {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        };
        let _ = write!(out, "; SameSite={v}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use http::HeaderValue;

    fn jar(cookie: &str) -> CookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        CookieJar::from_headers(&headers)
    }

    #[test]
    fn parses_and_decodes_request_cookies() {
        let jar = jar("a=1; name=hello%20world; quoted=\"x\"; a=2; junk");
        assert_eq!(jar.get("a").as_deref(), Some("1"));
        assert_eq!(jar.get("name").as_deref(), Some("hello world"));
        assert_eq!(jar.get("quoted").as_deref(), Some("x"));
        assert_eq!(jar.get("junk"), None);
    }

    #[test]
    fn pending_changes_are_visible_and_flushed_once() {
        let jar = jar("theme=dark");
        jar.set("theme", "light");
        jar.remove("stale");
        assert_eq!(jar.get("theme").as_deref(), Some("light"));
        assert_eq!(jar.get("stale"), None);

        let mut rsp = Response::text("");
        jar.flush(&mut rsp);
        let headers: Vec<_> = rsp.header_all("set-cookie").collect();
        assert_eq!(headers, [
            "theme=light; Path=/",
            "stale=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        ]);

        let mut again = Response::text("");
        jar.flush(&mut again);
        assert_eq!(again.header_all("set-cookie").count(), 0);
    }

    #[test]
    fn renders_every_attribute() {
        let jar = CookieJar::default();
        let at = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        jar.set_with("sid", "a b", CookieOptions::default()
            .domain("example.com")
            .max_age(Duration::from_secs(3600))
            .expires(at)
            .secure()
            .http_only()
            .same_site(SameSite::Lax));

        let mut rsp = Response::text("");
        jar.flush(&mut rsp);
        assert_eq!(
            rsp.header("set-cookie"),
            Some("sid=a%20b; Path=/; Domain=example.com; Max-Age=3600; \
                  Expires=Wed, 02 Jan 2030 03:04:05 GMT; Secure; HttpOnly; SameSite=Lax"),
        );
    }
}
