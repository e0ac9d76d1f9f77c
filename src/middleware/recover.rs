use std::any::Any;
use std::fmt::Write as _;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::error;

use super::{Middleware, Next};
use crate::error::Error;
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// Last line of defence: turns controller panics and non-HTTP errors into a
/// `500 Internal Server Error`.
///
/// With `debug` on, the body shows the url, the failure and a dump of the
/// request (CGI-style names, one `key => value` per line). Never enable it
/// in production. HTTP errors pass through untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct Recover {
    debug: bool,
}

impl Recover {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }
}

impl Middleware for Recover {
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        let url = req.url();
        let environ = self.debug.then(|| environ(&req));
        Box::pin(async move {
            // `run` itself may panic before yielding a future, so it goes inside too.
            let guarded = AssertUnwindSafe(async move { next.run(req).await });
            let failure = match guarded.catch_unwind().await {
                Ok(Ok(rsp)) => return Ok(rsp),
                Ok(Err(Error::Http(e))) => return Err(Error::Http(e)),
                Ok(Err(e)) => {
                    error!(%url, error = %e, "request failed");
                    e.to_string()
                }
                Err(panic) => {
                    let msg = panic_message(panic.as_ref());
                    error!(%url, panic = %msg, "controller panicked");
                    format!("panicked: {msg}")
                }
            };

            let body = match environ {
                Some(environ) => format!("url: {url}\n{failure}\nenviron:\n{environ}"),
                None => Status::InternalServerError.description(),
            };
            Ok(Response::builder()
                .status(Status::InternalServerError)
                .text(body))
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

fn environ(req: &Request) -> String {
    let mut vars = vec![
        ("REQUEST_METHOD".to_owned(), req.method().to_string()),
        ("PATH_INFO".to_owned(), req.path().to_owned()),
        ("QUERY_STRING".to_owned(), req.query().unwrap_or("").to_owned()),
    ];
    if let Some(addr) = req.remote_addr() {
        vars.push(("REMOTE_ADDR".to_owned(), addr.to_string()));
    }
    for (name, value) in req.headers() {
        let key = format!("HTTP_{}", name.as_str().to_ascii_uppercase().replace('-', "_"));
        vars.push((key, String::from_utf8_lossy(value.as_bytes()).into_owned()));
    }
    vars.sort();

    let mut out = String::new();
    for (key, value) in vars {
        let _ = writeln!(out, "{key} => {value}");
    }
    out
}
