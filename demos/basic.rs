//! Minimal drape app: sessions, cookies, JSON errors and health checks.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/users/42
//!   curl -i -H 'accept: application/json' http://localhost:3000/users/7
//!   curl -i -c jar -X POST -d 'name=ada' http://localhost:3000/login
//!   curl -i -b jar http://localhost:3000/me
//!   curl -i http://localhost:3000/healthz

use drape::config::Config;
use drape::{App, HttpError, Request, Response, Router, Server, health, post_only};

#[tokio::main]
async fn main() -> drape::Result<()> {
    let config = Config::load()?;
    drape::telemetry::init(&config.log)?;

    let router = Router::new()
        .get("/users/{id}", get_user)
        .get("/login",      post_only(login))
        .post("/login",     post_only(login))
        .get("/me",         me)
        .get("/healthz",    health::liveness)
        .get("/readyz",     health::readiness);

    Server::from_config(&config.server)?
        .serve(App::with_defaults(router, &config))
        .await
}

// GET /users/{id}
async fn get_user(req: Request) -> drape::Result<Response> {
    match req.param("id") {
        Some("42") => Response::json_value(&serde_json::json!({ "id": 42, "name": "ada" })),
        _ => Err(HttpError::not_found(req.path()).into()),
    }
}

// POST /login  (name=<user>)
async fn login(req: Request) -> drape::Result<Response> {
    let name = req.form()
        .into_iter()
        .find(|(k, _)| k == "name")
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| HttpError::bad_request("name", "required"))?;

    if let Some(session) = req.session() {
        session.regenerate();
        session.set("user", &name)?;
    }
    Ok(Response::redirect("/me"))
}

// GET /me
async fn me(req: Request) -> drape::Result<Response> {
    let user: String = req.session()
        .and_then(|s| s.get("user"))
        .ok_or_else(HttpError::unauthorized)?;
    Ok(Response::html(format!("<h1>hello {user}</h1>")))
}
