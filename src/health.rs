//! Health-check controllers for load balancers and orchestrators.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? |
//! | **Readiness** | `/readyz` | Can it serve traffic? |
//!
//! ```rust,no_run
//! use drape::{Router, health};
//!
//! let app = Router::new()
//!     .get("/healthz", health::liveness)
//!     .get("/readyz", health::readiness);
//! ```
//!
//! Gate readiness on the database by writing your own:
//!
//! ```rust,no_run
//! use drape::db::Db;
//! use drape::{Request, Response, Status};
//!
//! async fn readiness(req: Request) -> Response {
//!     let Some(db) = req.extension::<Db>() else {
//!         return Response::status(Status::ServiceUnavailable);
//!     };
//!     match db.query("SELECT 1", &[]).await {
//!         Ok(_) => Response::text("ready"),
//!         Err(_) => Response::status(Status::ServiceUnavailable),
//!     }
//! }
//! ```

use crate::{Request, Response};

/// Liveness probe: always `200 ok`.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// Readiness probe (default): always `200 ready`.
pub async fn readiness(_req: Request) -> Response {
    Response::text("ready")
}
