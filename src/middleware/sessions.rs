use std::sync::Arc;
use std::time::Duration;

use super::{Middleware, Next};
use crate::config::SessionConfig;
use crate::cookie::{CookieJar, CookieOptions, SameSite};
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::session::{Persisted, Session, SessionStore};

/// Loads the request's [`Session`] before the controller runs and persists
/// it afterwards, keeping the session cookie in step.
///
/// Uses the request's [`CookieJar`] when [`Cookies`](super::Cookies) runs
/// further out; otherwise it manages a jar of its own.
#[derive(Clone)]
pub struct Sessions {
    store: Arc<dyn SessionStore>,
    cookie_name: Arc<str>,
    ttl: Duration,
    cookie: CookieOptions,
}

impl Sessions {
    pub fn new(store: Arc<dyn SessionStore>, config: &SessionConfig) -> Self {
        let mut cookie = CookieOptions::default().same_site(SameSite::Lax);
        cookie.secure = config.secure;
        cookie.http_only = config.http_only;
        Self {
            store,
            cookie_name: config.cookie_name.as_str().into(),
            ttl: config.ttl(),
            cookie,
        }
    }
}

impl Middleware for Sessions {
    fn handle(&self, mut req: Request, next: Next) -> BoxFuture {
        let this = self.clone();
        Box::pin(async move {
            let (jar, own_jar) = match req.cookies() {
                Some(jar) => (jar.clone(), false),
                None => (CookieJar::from_headers(req.headers()), true),
            };

            let session = Session::start(this.store.as_ref(), jar.get(&this.cookie_name)).await?;
            req.extensions_mut().insert(session.clone());

            let mut rsp = next.run(req).await?;

            match session.persist(this.store.as_ref(), this.ttl).await? {
                // The store slides the expiry on every request; the cookie follows.
                Persisted::Issued(id) | Persisted::Refreshed(id) => {
                    jar.set_with(&this.cookie_name, &id, this.cookie.clone().max_age(this.ttl));
                }
                Persisted::Destroyed => jar.remove_with(&this.cookie_name, this.cookie.clone()),
                Persisted::Kept => {}
            }
            if own_jar {
                jar.flush(&mut rsp);
            }
            Ok(rsp)
        })
    }
}
