use super::{Middleware, Next};
use crate::handler::BoxFuture;
use crate::request::Request;

const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Fills in headers every response should carry.
///
/// Adds `content-type: text/html; charset=utf-8` when the controller set
/// none, and always sets `x-powered-by`.
#[derive(Clone, Debug)]
pub struct ExtraHeaders {
    powered_by: String,
}

impl Default for ExtraHeaders {
    fn default() -> Self {
        Self { powered_by: concat!("drape/", env!("CARGO_PKG_VERSION")).to_owned() }
    }
}

impl ExtraHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the `x-powered-by` value.
    pub fn powered_by(mut self, value: impl Into<String>) -> Self {
        self.powered_by = value.into();
        self
    }
}

impl Middleware for ExtraHeaders {
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        let powered_by = self.powered_by.clone();
        Box::pin(async move {
            let mut rsp = next.run(req).await?;
            if !rsp.has_header("content-type") {
                rsp.set_header("content-type", DEFAULT_CONTENT_TYPE);
            }
            rsp.set_header("x-powered-by", powered_by);
            Ok(rsp)
        })
    }
}
