//! Server-side sessions.
//!
//! The client only ever holds an opaque id in a cookie; the data lives in a
//! [`SessionStore`]. The [`Sessions`](crate::middleware::Sessions) middleware
//! loads the session before the controller runs and persists it afterwards.
//!
//! A session is written back only when it was modified, and a brand-new
//! session is not stored (nor its cookie sent) until something is put in it.
//! Every request on an existing session slides its expiry, in the store and
//! in the cookie's `Max-Age` alike.

mod memory;
mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;
use crate::util::random_str;

/// Key/value payload of a session.
pub type SessionData = serde_json::Map<String, Value>;

const ID_LEN: usize = 32;

/// Where session payloads live between requests.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Returns the payload for `id`, or `None` when unknown or expired.
    async fn load(&self, id: &str) -> Result<Option<SessionData>>;

    /// Inserts or replaces the payload for `id`, valid for `ttl`.
    async fn save(&self, id: &str, data: &SessionData, ttl: Duration) -> Result<()>;

    async fn destroy(&self, id: &str) -> Result<()>;

    /// Extends the lifetime of an unmodified session.
    async fn touch(&self, _id: &str, _ttl: Duration) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct State {
    id: String,
    data: SessionData,
    is_new: bool,
    dirty: bool,
    destroyed: bool,
    // Id replaced by `regenerate`, to be removed from the store.
    retired: Option<String>,
}

/// Handle to the current request's session.
///
/// Cloning is cheap; clones share the same data.
#[derive(Clone, Debug)]
pub struct Session {
    inner: Arc<Mutex<State>>,
}

/// What [`Session::persist`] did, so the caller can update the cookie.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Persisted {
    /// Nothing for the client to learn.
    Kept,
    /// The client must receive this new id.
    Issued(String),
    /// The stored expiry moved forward; the cookie's must follow.
    Refreshed(String),
    /// The client must forget its id.
    Destroyed,
}

impl Session {
    fn fresh() -> Self {
        Self::from_state(State {
            id: random_str(ID_LEN),
            data: SessionData::new(),
            is_new: true,
            dirty: false,
            destroyed: false,
            retired: None,
        })
    }

    fn from_state(state: State) -> Self {
        Self { inner: Arc::new(Mutex::new(state)) }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resumes the session named by the client, or starts a new one when the
    /// id is missing, unknown or expired. Unknown ids are never adopted.
    pub(crate) async fn start(store: &dyn SessionStore, id: Option<String>) -> Result<Self> {
        if let Some(id) = id {
            if let Some(data) = store.load(&id).await? {
                return Ok(Self::from_state(State {
                    id,
                    data,
                    is_new: false,
                    dirty: false,
                    destroyed: false,
                    retired: None,
                }));
            }
        }
        Ok(Self::fresh())
    }

    pub fn id(&self) -> String {
        self.state().id.clone()
    }

    /// `true` until the session has been stored once.
    pub fn is_new(&self) -> bool {
        self.state().is_new
    }

    /// Raw JSON value stored under `key`.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.state().data.get(key).cloned()
    }

    /// Value stored under `key`, deserialized. `None` if absent or of another shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_value(key).and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let mut state = self.state();
        state.data.insert(key.to_owned(), value);
        state.dirty = true;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut state = self.state();
        let old = state.data.remove(key);
        state.dirty |= old.is_some();
        old
    }

    pub fn clear(&self) {
        let mut state = self.state();
        if !state.data.is_empty() {
            state.data.clear();
            state.dirty = true;
        }
    }

    /// Drops the session from the store and tells the client to forget it.
    pub fn destroy(&self) {
        let mut state = self.state();
        state.data.clear();
        state.destroyed = true;
    }

    /// Moves the data to a new id, e.g. after login.
    pub fn regenerate(&self) {
        let mut state = self.state();
        let old = std::mem::replace(&mut state.id, random_str(ID_LEN));
        if !state.is_new && state.retired.is_none() {
            state.retired = Some(old);
        }
        state.dirty = true;
        state.is_new = true;
    }

    /// Writes pending changes to `store`.
    pub(crate) async fn persist(&self, store: &dyn SessionStore, ttl: Duration) -> Result<Persisted> {
        // Snapshot under the lock; the guard must not live across `.await`.
        let (id, data, is_new, dirty, destroyed, retired) = {
            let mut s = self.state();
            (s.id.clone(), s.data.clone(), s.is_new, s.dirty, s.destroyed, s.retired.take())
        };

        if let Some(old) = retired {
            store.destroy(&old).await?;
        }

        if destroyed {
            if is_new {
                return Ok(Persisted::Kept);
            }
            store.destroy(&id).await?;
            return Ok(Persisted::Destroyed);
        }

        if is_new && data.is_empty() {
            return Ok(Persisted::Kept);
        }

        if dirty {
            store.save(&id, &data, ttl).await?;
            let mut s = self.state();
            s.dirty = false;
            if is_new {
                s.is_new = false;
                return Ok(Persisted::Issued(id));
            }
            return Ok(Persisted::Refreshed(id));
        }

        store.touch(&id, ttl).await?;
        Ok(Persisted::Refreshed(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn empty_new_session_is_not_stored() {
        let store = MemoryStore::new();
        let session = Session::start(&store, None).await.unwrap();
        assert!(session.is_new());
        assert_eq!(session.persist(&store, TTL).await.unwrap(), Persisted::Kept);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn new_session_with_data_is_issued_then_resumed() {
        let store = MemoryStore::new();
        let session = Session::start(&store, None).await.unwrap();
        session.set("user_id", &42).unwrap();

        let id = match session.persist(&store, TTL).await.unwrap() {
            Persisted::Issued(id) => id,
            other => panic!("expected a new id, got {other:?}"),
        };
        assert_eq!(id.len(), ID_LEN);

        let resumed = Session::start(&store, Some(id.clone())).await.unwrap();
        assert!(!resumed.is_new());
        assert_eq!(resumed.id(), id);
        assert_eq!(resumed.get::<u32>("user_id"), Some(42));
        assert_eq!(resumed.get::<String>("user_id"), None);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_adopted() {
        let store = MemoryStore::new();
        let session = Session::start(&store, Some("forged".into())).await.unwrap();
        assert!(session.is_new());
        assert_ne!(session.id(), "forged");
    }

    #[tokio::test]
    async fn destroy_removes_from_store() {
        let store = MemoryStore::new();
        store.save("abc", &SessionData::new(), TTL).await.unwrap();
        let session = Session::start(&store, Some("abc".into())).await.unwrap();
        session.destroy();
        assert_eq!(session.persist(&store, TTL).await.unwrap(), Persisted::Destroyed);
        assert!(store.load("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn regenerate_retires_the_old_id() {
        let store = MemoryStore::new();
        let mut data = SessionData::new();
        data.insert("cart".into(), Value::from(3));
        store.save("old", &data, TTL).await.unwrap();

        let session = Session::start(&store, Some("old".into())).await.unwrap();
        session.regenerate();
        let Persisted::Issued(new_id) = session.persist(&store, TTL).await.unwrap() else {
            panic!("expected a new id");
        };
        assert_ne!(new_id, "old");
        assert!(store.load("old").await.unwrap().is_none());
        assert_eq!(store.load(&new_id).await.unwrap().unwrap()["cart"], 3);
    }

    #[tokio::test]
    async fn resumed_session_is_refreshed() {
        let store = MemoryStore::new();
        store.save("abc", &SessionData::new(), TTL).await.unwrap();
        let session = Session::start(&store, Some("abc".into())).await.unwrap();
        assert!(session.remove("missing").is_none());
        assert_eq!(
            session.persist(&store, TTL).await.unwrap(),
            Persisted::Refreshed("abc".into())
        );

        let session = Session::start(&store, Some("abc".into())).await.unwrap();
        session.set("n", &1).unwrap();
        assert_eq!(
            session.persist(&store, TTL).await.unwrap(),
            Persisted::Refreshed("abc".into())
        );
    }
}
