use super::{Middleware, Next};
use crate::cookie::CookieJar;
use crate::handler::BoxFuture;
use crate::request::Request;

/// Gives each request a [`CookieJar`] and writes its changes back as
/// `set-cookie` headers.
#[derive(Clone, Copy, Debug, Default)]
pub struct Cookies;

impl Middleware for Cookies {
    fn handle(&self, mut req: Request, next: Next) -> BoxFuture {
        let jar = CookieJar::from_headers(req.headers());
        req.extensions_mut().insert(jar.clone());
        Box::pin(async move {
            let mut rsp = next.run(req).await?;
            jar.flush(&mut rsp);
            Ok(rsp)
        })
    }
}
