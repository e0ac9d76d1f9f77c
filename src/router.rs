//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. You register a path, you
//! get a controller. Method mismatches are reported separately from unknown
//! paths so dispatch can answer `405` instead of `404`.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;

/// The application router.
///
/// Build it once at startup and hand it to [`App`](crate::App). Each
/// registration returns `self` so calls chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

/// Result of looking a request up in the [`Router`].
pub(crate) enum Route {
    Found(BoxedHandler, HashMap<String, String>),
    /// The path exists, but not for this method. Carries the methods that
    /// would have matched, sorted by name.
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a controller for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use drape::{Method, Request, Response, Router};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::Get,  "/users/{id}", get_user)
    ///     .on(Method::Post, "/users",      create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is malformed or conflicts with an existing route for
    /// the same method. Routes are registered at startup, so this surfaces
    /// as a boot failure rather than a request-time error.
    pub fn on(mut self, method: Method, path: &str, controller: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, controller.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{method} {path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, controller: impl Handler) -> Self {
        self.on(Method::Get, path, controller)
    }

    pub fn post(self, path: &str, controller: impl Handler) -> Self {
        self.on(Method::Post, path, controller)
    }

    pub fn put(self, path: &str, controller: impl Handler) -> Self {
        self.on(Method::Put, path, controller)
    }

    pub fn patch(self, path: &str, controller: impl Handler) -> Self {
        self.on(Method::Patch, path, controller)
    }

    pub fn delete(self, path: &str, controller: impl Handler) -> Self {
        self.on(Method::Delete, path, controller)
    }

    pub(crate) fn lookup(&self, method: Method, path: &str) -> Route {
        if let Some(matched) = self.routes.get(&method).and_then(|tree| tree.at(path).ok()) {
            let handler = Arc::clone(matched.value);
            let params = matched.params.iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
            return Route::Found(handler, params);
        }

        let mut allowed: Vec<Method> = self.routes.iter()
            .filter(|(m, tree)| **m != method && tree.at(path).is_ok())
            .map(|(m, _)| *m)
            .collect();
        if allowed.is_empty() {
            return Route::NotFound;
        }
        allowed.sort_by_key(|m| m.as_str());
        Route::MethodNotAllowed(allowed)
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Response;

    async fn noop(_req: crate::Request) -> Response {
        Response::text("")
    }

    fn router() -> Router {
        Router::new()
            .get("/users/{id}", noop)
            .delete("/users/{id}", noop)
            .post("/users", noop)
    }

    #[test]
    fn finds_route_and_params() {
        match router().lookup(Method::Get, "/users/42") {
            Route::Found(_, params) => assert_eq!(params["id"], "42"),
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn reports_allowed_methods_on_mismatch() {
        match router().lookup(Method::Put, "/users/42") {
            Route::MethodNotAllowed(allowed) => {
                assert_eq!(allowed, vec![Method::Delete, Method::Get]);
            }
            _ => panic!("expected method mismatch"),
        }
    }

    #[test]
    fn unknown_path_is_not_found() {
        assert!(matches!(router().lookup(Method::Get, "/nope"), Route::NotFound));
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_routes_panic() {
        let _ = Router::new().get("/a", noop).get("/a", noop);
    }
}
