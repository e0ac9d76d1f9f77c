//! The application: a router wrapped in a middleware stack.

use std::future::ready;
use std::sync::Arc;

use http::Extensions;
use tracing::error;

use crate::config::Config;
use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::http_error::HttpError;
use crate::middleware::{
    Cookies, ExtraHeaders, HttpErrors, Middleware, Next, Recover, Sessions, Trace,
};
use crate::request::Request;
use crate::response::{Outcome, Response};
use crate::router::{Route, Router};
use crate::session::{MemoryStore, SessionStore};
use crate::status::Status;

type Injector = Arc<dyn Fn(&mut Extensions) + Send + Sync>;

/// A router plus the middleware around it.
///
/// Each [`layer`](App::layer) wraps everything added before it, so the
/// last layer added sees the request first.
///
/// ```rust,no_run
/// use drape::config::Config;
/// use drape::{App, Request, Response, Router, Server};
///
/// # async fn run() -> drape::Result<()> {
/// let config = Config::load()?;
/// let router = Router::new().get("/", |_req: Request| async { Response::html("<h1>hi</h1>") });
///
/// Server::from_config(&config.server)?
///     .serve(App::with_defaults(router, &config))
///     .await
/// # }
/// ```
pub struct App {
    stack: Arc<[Arc<dyn Middleware>]>,
    endpoint: BoxedHandler,
    injectors: Vec<Injector>,
}

impl App {
    /// An app with no middleware: requests go straight to controller dispatch.
    pub fn new(router: Router) -> Self {
        Self {
            stack: Arc::from(Vec::new()),
            endpoint: Arc::new(Dispatch { router }),
            injectors: Vec::new(),
        }
    }

    /// The standard stack with an in-memory session store.
    pub fn with_defaults(router: Router, config: &Config) -> Self {
        Self::with_session_store(router, config, Arc::new(MemoryStore::new()))
    }

    /// The standard stack (see [`middleware`](crate::middleware)) with the
    /// given session store.
    pub fn with_session_store(router: Router, config: &Config, store: Arc<dyn SessionStore>) -> Self {
        Self::new(router)
            .layer(HttpErrors)
            .layer(ExtraHeaders::new())
            .layer(Sessions::new(store, &config.session))
            .layer(Cookies)
            .layer(Recover::new(config.debug))
            .layer(Trace)
    }

    /// Wraps the current pipeline in `middleware`.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        let mut stack = self.stack.to_vec();
        stack.push(Arc::new(middleware));
        self.stack = stack.into();
        self
    }

    /// Makes `value` available to every request via [`Request::extension`].
    pub fn extension<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.injectors.push(Arc::new(move |ext: &mut Extensions| {
            ext.insert(value.clone());
        }));
        self
    }

    /// Runs one request through the pipeline.
    ///
    /// Errors that escape every layer still produce a response: HTTP errors
    /// as plain text, anything else as a bare `500`.
    pub async fn handle(&self, mut req: Request) -> Response {
        for inject in &self.injectors {
            inject(req.extensions_mut());
        }
        let next = Next::new(Arc::clone(&self.stack), Arc::clone(&self.endpoint));
        match next.run(req).await {
            Ok(rsp) => rsp,
            Err(Error::Http(e)) => e.to_response(false),
            Err(e) => {
                error!(error = %e, "unhandled error reached the top of the pipeline");
                Response::builder()
                    .status(Status::InternalServerError)
                    .text(Status::InternalServerError.description())
            }
        }
    }
}

/// Innermost pipeline step: find the controller and run it.
struct Dispatch {
    router: Router,
}

impl ErasedHandler for Dispatch {
    fn call(&self, mut req: Request) -> BoxFuture {
        match self.router.lookup(req.method(), req.path()) {
            Route::Found(controller, params) => {
                req.params = params;
                controller.call(req)
            }
            Route::MethodNotAllowed(allowed) => {
                let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
                let e = HttpError::not_allowed().with_header("allow", allow);
                Box::pin(ready(Outcome::Err(e.into())))
            }
            Route::NotFound => Box::pin(ready(Outcome::Err(HttpError::not_found(req.path()).into()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::from_fn;
    use bytes::Bytes;

    fn request(method: &str, uri: &str) -> Request {
        let req = http::Request::builder().method(method).uri(uri).body(Bytes::new()).unwrap();
        Request::from_http(req).unwrap()
    }

    #[tokio::test]
    async fn unknown_path_is_404_with_path_in_body() {
        let app = App::new(Router::new());
        let rsp = app.handle(request("GET", "/nowhere")).await;
        assert_eq!(rsp.status_code(), Status::NotFound);
        assert_eq!(rsp.body(), b"can not found: /nowhere");
    }

    #[tokio::test]
    async fn wrong_method_is_405_with_allow() {
        let app = App::new(Router::new().get("/a", |_req: Request| async { "a" }));
        let rsp = app.handle(request("POST", "/a")).await;
        assert_eq!(rsp.status_code(), Status::MethodNotAllowed);
        assert_eq!(rsp.header("allow"), Some("GET"));
    }

    #[tokio::test]
    async fn path_params_reach_the_controller() {
        let app = App::new(Router::new().get("/users/{id}", |req: Request| async move {
            format!("user {}", req.param("id").unwrap_or("?"))
        }));
        assert_eq!(app.handle(request("GET", "/users/7")).await.body(), b"user 7");
    }

    #[tokio::test]
    async fn later_layers_run_first() {
        let tag = |name: &'static str| {
            from_fn(move |req: Request, next: Next| async move {
                let mut rsp = next.run(req).await?;
                let seen = rsp.header("x-order").map(|v| format!("{v},{name}")).unwrap_or(name.to_owned());
                rsp.set_header("x-order", seen);
                Ok::<_, Error>(rsp)
            })
        };
        let app = App::new(Router::new().get("/", |_req: Request| async { "ok" }))
            .layer(tag("inner"))
            .layer(tag("outer"));
        // Responses unwind inner → outer.
        assert_eq!(app.handle(request("GET", "/")).await.header("x-order"), Some("inner,outer"));
    }

    #[tokio::test]
    async fn extensions_are_injected() {
        #[derive(Clone)]
        struct SiteName(&'static str);

        let app = App::new(Router::new().get("/", |req: Request| async move {
            req.extension::<SiteName>().map(|s| s.0).unwrap_or("none")
        }))
        .extension(SiteName("blog"));
        assert_eq!(app.handle(request("GET", "/")).await.body(), b"blog");
    }
}
