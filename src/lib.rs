//! # drape
//!
//! A minimal web-application framework: routing, a middleware pipeline,
//! HTTP error semantics, cookies and sessions, and a thin MySQL wrapper.
//!
//! ## How a request flows
//!
//! ```text
//! hyper ─▶ Trace ─▶ Recover ─▶ Cookies ─▶ Sessions ─▶ ExtraHeaders ─▶ HttpErrors ─▶ router ─▶ controller
//! ```
//!
//! Controllers are plain async functions. They return a [`Response`], or
//! anything that converts into one, or an [`HttpError`] when the request
//! cannot be served. The middleware stack turns errors into responses, so a
//! controller never has to format a 404 by hand.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use drape::config::Config;
//! use drape::{App, HttpError, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> drape::Result<()> {
//!     let config = Config::load()?;
//!     drape::telemetry::init(&config.log)?;
//!
//!     let router = Router::new()
//!         .get("/users/{id}", get_user)
//!         .post("/login",     login);
//!
//!     Server::from_config(&config.server)?
//!         .serve(App::with_defaults(router, &config))
//!         .await
//! }
//!
//! async fn get_user(req: Request) -> drape::Result<Response> {
//!     let id = req.param("id").unwrap_or_default();
//!     if id != "42" {
//!         return Err(HttpError::not_found(req.path()).into());
//!     }
//!     Response::json_value(&serde_json::json!({ "id": 42, "name": "ada" }))
//! }
//!
//! async fn login(req: Request) -> drape::Result<Response> {
//!     if let Some(session) = req.session() {
//!         session.regenerate();
//!         session.set("user", "ada")?;
//!     }
//!     Ok(Response::redirect("/"))
//! }
//! ```

mod app;
mod cookie;
mod error;
mod handler;
mod http_error;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod config;
pub mod db;
pub mod health;
pub mod middleware;
pub mod session;
pub mod telemetry;
pub mod util;

pub use app::App;
pub use cookie::{CookieJar, CookieOptions, SameSite};
pub use error::{Error, Result};
pub use handler::{BoxFuture, Handler};
pub use http_error::{HttpError, post_only};
pub use method::{Method, UnknownMethod};
pub use request::Request;
pub use response::{ContentType, IntoOutcome, IntoResponse, Outcome, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use session::Session;
pub use status::Status;
