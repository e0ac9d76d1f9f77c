//! Controllers and how they are stored.
//!
//! A controller is any `async fn(Request) -> impl IntoOutcome`. Routes hold
//! controllers of many concrete types, so each one is erased on registration:
//!
//! ```text
//! router.get("/users/{id}", get_user)
//!     get_user.into_boxed_handler()  -> Arc<Erased<get_user>>
//!     lookup at request time         -> BoxedHandler (Arc clone)
//!     handler.call(req)              -> BoxFuture<Outcome>
//! ```
//!
//! Middleware ([`Next::run`](crate::middleware::Next::run)) and the
//! controller dispatch share the [`BoxFuture`] type, so the whole pipeline
//! speaks `Outcome`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoOutcome, Outcome};

/// Boxed `Send` future; defaults to the pipeline's [`Outcome`].
pub type BoxFuture<T = Outcome> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Anything the router accepts as a controller.
///
/// Sealed; satisfied automatically by
///
/// ```text
/// async fn name(req: Request) -> impl IntoOutcome
/// ```
///
/// and by closures of the same shape, including the wrappers returned by
/// [`post_only`](crate::post_only).
pub trait Handler: sealed::Controller + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod sealed {
    pub trait Controller {}
}

impl<F, Fut, R> sealed::Controller for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(Erased(self))
    }
}

struct Erased<F>(F);

impl<F, Fut, R> ErasedHandler for Erased<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let pending = (self.0)(req);
        Box::pin(async move { pending.await.into_outcome() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, HttpError, Response, Status};
    use bytes::Bytes;

    fn get() -> Request {
        Request::from_http(http::Request::get("/").body(Bytes::new()).unwrap()).unwrap()
    }

    async fn plain(_req: Request) -> &'static str {
        "hi"
    }

    async fn failing(_req: Request) -> Result<Response, HttpError> {
        Err(HttpError::forbidden())
    }

    #[tokio::test]
    async fn erased_controllers_yield_outcomes() {
        let ok = plain.into_boxed_handler().call(get()).await.unwrap();
        assert_eq!(ok.body(), b"hi");

        match failing.into_boxed_handler().call(get()).await {
            Err(Error::Http(e)) => assert_eq!(e.status(), Status::Forbidden),
            other => panic!("unexpected outcome: {:?}", other.map(|r| r.status_code())),
        }
    }
}
