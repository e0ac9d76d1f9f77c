//! HTTP errors as values.
//!
//! A controller that cannot produce its normal response returns one of these
//! (usually through `?`). The error carries the status to answer with and the
//! body to show the client.
//!
//! ```rust
//! use drape::{Error, HttpError, Request, Response};
//!
//! async fn show_user(req: Request) -> Result<Response, Error> {
//!     let id = req.query_int("id")
//!         .ok_or_else(|| HttpError::bad_request("id", "must be an integer"))?;
//!     Ok(Response::text(format!("user {id}")))
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::handler::Handler;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// An error that maps directly onto an HTTP response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpError {
    status: Status,
    body: Option<String>,
    headers: Vec<(String, String)>,
}

impl HttpError {
    /// An error whose body is the status description (`"403 Forbidden"`).
    pub fn new(status: Status) -> Self {
        Self { status, body: None, headers: Vec::new() }
    }

    /// An error with a custom body.
    pub fn with_body(status: Status, body: impl Into<String>) -> Self {
        Self { status, body: Some(body.into()), headers: Vec::new() }
    }

    /// Adds a header to the rendered response (e.g. `allow` on a 405).
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    /// `400 Bad Request` naming the offending parameter.
    pub fn bad_request(param: &str, msg: &str) -> Self {
        Self::with_body(Status::BadRequest, format!("{param} invalid: {msg}"))
    }

    /// `401 Unauthorized`.
    pub fn unauthorized() -> Self {
        Self::new(Status::Unauthorized)
    }

    /// `403 Forbidden`.
    pub fn forbidden() -> Self {
        Self::new(Status::Forbidden)
    }

    /// `404 Not Found` for `path`.
    pub fn not_found(path: &str) -> Self {
        Self::with_body(Status::NotFound, format!("can not found: {path}"))
    }

    /// `405 Method Not Allowed`.
    pub fn not_allowed() -> Self {
        Self::new(Status::MethodNotAllowed)
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn code(&self) -> u16 {
        self.status.code()
    }

    pub fn description(&self) -> String {
        self.status.description()
    }

    /// Text shown to the client.
    pub fn body(&self) -> String {
        self.body.clone().unwrap_or_else(|| self.description())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Renders the error. With `as_json` the body is [`body`](Self::body)
    /// as a JSON string; otherwise it is plain text.
    pub fn to_response(&self, as_json: bool) -> Response {
        let builder = self.headers.iter().fold(
            Response::builder().status(self.status),
            |b, (name, value)| b.header(name, value),
        );
        if as_json {
            builder.json(serde_json::Value::String(self.body()).to_string().into_bytes())
        } else {
            builder.text(self.body())
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            Some(body) => write!(f, "{}: {body}", self.status),
            None => write!(f, "{}", self.status),
        }
    }
}

impl std::error::Error for HttpError {}

/// Wraps a controller so it only answers `POST`; anything else gets
/// `405 Method Not Allowed`.
///
/// ```rust,no_run
/// use drape::{Method, Request, Response, Router, post_only};
///
/// async fn upload(_req: Request) -> Response { Response::text("stored") }
///
/// // Routed for every method, accepted only for POST.
/// let app = Router::new()
///     .on(Method::Get,  "/upload", post_only(upload))
///     .on(Method::Post, "/upload", post_only(upload));
/// ```
pub fn post_only(controller: impl Handler) -> impl Handler + Clone {
    let inner = controller.into_boxed_handler();
    move |req: Request| {
        let inner = Arc::clone(&inner);
        async move {
            if req.method() != Method::Post {
                return Err(Error::from(HttpError::not_allowed()));
            }
            inner.call(req).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_names_the_parameter() {
        let e = HttpError::bad_request("page", "not a number");
        assert_eq!(e.code(), 400);
        assert_eq!(e.description(), "400 Bad Request");
        assert_eq!(e.body(), "page invalid: not a number");
    }

    #[test]
    fn not_found_names_the_path() {
        let e = HttpError::not_found("/missing");
        assert_eq!(e.status(), Status::NotFound);
        assert_eq!(e.body(), "can not found: /missing");
    }

    #[test]
    fn plain_errors_use_the_description_as_body() {
        assert_eq!(HttpError::forbidden().body(), "403 Forbidden");
        assert_eq!(HttpError::not_allowed().body(), "405 Method Not Allowed");
        assert_eq!(HttpError::new(Status::Gone).body(), "410 Gone");
    }

    #[test]
    fn renders_text_or_json() {
        let e = HttpError::not_found(r#"/a "b""#).with_header("X-Trace", "1");

        let text = e.to_response(false);
        assert_eq!(text.status_code(), Status::NotFound);
        assert_eq!(text.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(text.header("x-trace"), Some("1"));
        assert_eq!(text.body(), br#"can not found: /a "b""#);

        let json = e.to_response(true);
        assert_eq!(json.header("content-type"), Some("application/json"));
        assert_eq!(json.body(), br#""can not found: /a \"b\"""#);
    }
}
