//! Middleware pipeline.
//!
//! A middleware wraps everything registered before it: it sees the request
//! on the way in, decides whether and how to call [`Next`], and sees the
//! [`Outcome`] on the way out. The innermost step is controller dispatch
//! (router lookup + controller call).
//!
//! [`App::with_defaults`](crate::App::with_defaults) assembles the standard
//! stack, innermost first:
//!
//! | Layer | Job |
//! |---|---|
//! | [`HttpErrors`] | `Err(HttpError)` → text or JSON response |
//! | [`ExtraHeaders`] | default `content-type`, `x-powered-by` |
//! | [`Sessions`] | load the session before, persist it after |
//! | [`Cookies`] | parse `Cookie` before, emit `Set-Cookie` after |
//! | [`Recover`] | panics and internal errors → `500` |
//! | [`Trace`] | one span and one log line per request |
//!
//! Custom middleware is usually easiest with [`from_fn`]:
//!
//! ```rust
//! use drape::middleware::{from_fn, Next};
//! use drape::{App, Error, HttpError, Request, Router};
//!
//! let app = App::new(Router::new()).layer(from_fn(|req: Request, next: Next| async move {
//!     if req.header("x-api-key") != Some("secret") {
//!         return Err(Error::from(HttpError::forbidden()));
//!     }
//!     next.run(req).await
//! }));
//! ```

mod cookies;
mod extra_headers;
mod http_errors;
mod recover;
mod sessions;
mod trace;

pub use cookies::Cookies;
pub use extra_headers::ExtraHeaders;
pub use http_errors::HttpErrors;
pub use recover::Recover;
pub use sessions::Sessions;
pub use trace::Trace;

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler};
use crate::request::Request;
use crate::response::Outcome;

/// A step in the request pipeline.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: Request, next: Next) -> BoxFuture;
}

/// The rest of the pipeline, from the point of view of one middleware.
pub struct Next {
    // Innermost first; `stack[remaining - 1]` runs next.
    stack: Arc<[Arc<dyn Middleware>]>,
    remaining: usize,
    endpoint: BoxedHandler,
}

impl Next {
    pub(crate) fn new(stack: Arc<[Arc<dyn Middleware>]>, endpoint: BoxedHandler) -> Self {
        let remaining = stack.len();
        Self { stack, remaining, endpoint }
    }

    /// Passes the request to the next layer, ending at the controller.
    pub fn run(mut self, req: Request) -> BoxFuture {
        match self.remaining.checked_sub(1) {
            Some(index) => {
                self.remaining = index;
                let middleware = Arc::clone(&self.stack[index]);
                middleware.handle(req, self)
            }
            None => self.endpoint.call(req),
        }
    }
}

/// Middleware built from a closure; see [`from_fn`].
pub struct FromFn<F>(F);

/// Turns `async fn(Request, Next) -> Outcome` into a [`Middleware`].
pub fn from_fn<F, Fut>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    FromFn(f)
}

impl<F, Fut> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        Box::pin((self.0)(req, next))
    }
}
