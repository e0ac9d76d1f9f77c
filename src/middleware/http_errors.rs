use tracing::debug;

use super::{Middleware, Next};
use crate::error::Error;
use crate::handler::BoxFuture;
use crate::request::Request;

/// Turns [`HttpError`](crate::HttpError)s returned further in into responses.
///
/// Clients whose preferred media type is `application/json` get the error
/// body as a JSON string; everyone else gets `text/plain`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpErrors;

impl Middleware for HttpErrors {
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        let as_json = req.chief_accept().as_deref() == Some("application/json");
        Box::pin(async move {
            match next.run(req).await {
                Err(Error::Http(e)) => {
                    debug!(status = e.code(), body = %e.body(), "http error");
                    Ok(e.to_response(as_json))
                }
                other => other,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{App, HttpError, Router, Status};
    use bytes::Bytes;

    async fn forbidden(_req: Request) -> HttpError {
        HttpError::forbidden()
    }

    fn request(accept: &str) -> Request {
        let req = http::Request::builder()
            .uri("/admin")
            .header("accept", accept)
            .body(Bytes::new())
            .unwrap();
        Request::from_http(req).unwrap()
    }

    #[tokio::test]
    async fn json_clients_get_a_json_body() {
        let app = App::new(Router::new().get("/admin", forbidden)).layer(HttpErrors);
        let rsp = app.handle(request("application/json")).await;
        assert_eq!(rsp.status_code(), Status::Forbidden);
        assert_eq!(rsp.header("content-type"), Some("application/json"));
        assert_eq!(rsp.body(), br#""403 Forbidden""#);
    }

    #[tokio::test]
    async fn other_clients_get_text() {
        let app = App::new(Router::new().get("/admin", forbidden)).layer(HttpErrors);
        let rsp = app.handle(request("text/html, application/json;q=0.9")).await;
        assert_eq!(rsp.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(rsp.body(), b"403 Forbidden");
    }
}
