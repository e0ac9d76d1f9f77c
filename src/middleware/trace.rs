use std::time::Instant;

use tracing::{Instrument, info, info_span, warn};

use super::{Middleware, Next};
use crate::handler::BoxFuture;
use crate::request::Request;

/// Wraps each request in a `request` span and logs its status and latency.
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        let span = info_span!(
            "request",
            method = %req.method(),
            path = %req.path(),
            peer = ?req.remote_addr(),
        );
        let started = Instant::now();
        Box::pin(
            async move {
                let outcome = next.run(req).await;
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                match &outcome {
                    Ok(rsp) => info!(status = rsp.status_code().code(), latency_ms, "request finished"),
                    Err(e) => warn!(error = %e, latency_ms, "request failed"),
                }
                outcome
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{App, Error, Response, Router, Status};
    use bytes::Bytes;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    async fn made(_req: Request) -> Response {
        Response::builder().status(Status::Created).text("made")
    }

    async fn broken(_req: Request) -> crate::Result<Response> {
        Err(Error::other("disk on fire"))
    }

    fn get(uri: &str) -> Request {
        Request::from_http(http::Request::get(uri).body(Bytes::new()).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn logs_status_and_passes_outcome_through() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let app = App::new(Router::new().get("/made", made).get("/broken", broken)).layer(Trace);

        let rsp = app.handle(get("/made")).await;
        assert_eq!(rsp.status_code(), Status::Created);
        assert_eq!(rsp.body(), b"made");

        let rsp = app.handle(get("/broken")).await;
        assert_eq!(rsp.status_code(), Status::InternalServerError);

        let logs = captured.text();
        assert!(logs.contains("path=/made"), "{logs}");
        assert!(logs.contains("request finished"), "{logs}");
        assert!(logs.contains("status=201"), "{logs}");
        assert!(logs.contains("request failed"), "{logs}");
        assert!(logs.contains("disk on fire"), "{logs}");
    }
}
