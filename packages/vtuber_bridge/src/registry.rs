//! Session registry: at most one backend connection per chat channel.
//!
//! The registry is plain data owned by the bridge actor. It is never shared
//! across tasks, so it needs no locking.

use std::collections::HashMap;
use std::sync::Arc;

use crate::chat::{ChatSession, SessionKey};
use crate::connection::Connection;

/// Everything the bridge knows about one channel's connection.
pub struct ConnectionEntry {
    /// Where replies go. Refreshed on every inbound message and re-`up`.
    pub session: Arc<dyn ChatSession>,
    pub connection: Connection,
    /// History to resume on open; `None` creates a new one.
    pub history_uid: Option<String>,
}

impl ConnectionEntry {
    pub fn new(
        session: Arc<dyn ChatSession>,
        connection: Connection,
        history_uid: Option<String>,
    ) -> Self {
        Self {
            session,
            connection,
            history_uid: history_uid.filter(|uid| !uid.is_empty()),
        }
    }

    pub fn rebind(&mut self, session: Arc<dyn ChatSession>) {
        self.session = session;
    }
}

#[derive(Default)]
pub struct SessionRegistry {
    entries: HashMap<SessionKey, ConnectionEntry>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SessionKey) -> Option<&ConnectionEntry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &SessionKey) -> Option<&mut ConnectionEntry> {
        self.entries.get_mut(key)
    }

    /// Insert or replace the entry for `key`, returning the displaced one.
    pub fn put(&mut self, key: SessionKey, entry: ConnectionEntry) -> Option<ConnectionEntry> {
        self.entries.insert(key, entry)
    }

    pub fn remove(&mut self, key: &SessionKey) -> Option<ConnectionEntry> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &SessionKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SessionKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SessionKey, &ConnectionEntry)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&SessionKey, &mut ConnectionEntry)> {
        self.entries.iter_mut()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::RecordingSession;
    use crate::transport::ConnectionHandle;
    use tokio::sync::mpsc;
    use vtuber_protocol::text::PipelineOptions;

    fn entry(id: u64, history: Option<&str>) -> ConnectionEntry {
        let (tx, _rx) = mpsc::unbounded_channel();
        ConnectionEntry::new(
            RecordingSession::shared("p", "c", "t"),
            Connection::new(ConnectionHandle::new(id, tx), PipelineOptions::default()),
            history.map(str::to_string),
        )
    }

    #[test]
    fn put_and_get() {
        let mut reg = SessionRegistry::new();
        let key = SessionKey::new("p", "c", "t");
        assert!(reg.put(key.clone(), entry(1, None)).is_none());
        assert_eq!(reg.get(&key).unwrap().connection.id(), 1);
        assert!(reg.contains(&key));
    }

    #[test]
    fn put_replaces_never_duplicates() {
        let mut reg = SessionRegistry::new();
        let key = SessionKey::new("p", "c", "t");
        reg.put(key.clone(), entry(1, None));
        let old = reg.put(key.clone(), entry(2, None)).unwrap();
        assert_eq!(old.connection.id(), 1);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(&key).unwrap().connection.id(), 2);
    }

    #[test]
    fn keys_are_independent() {
        let mut reg = SessionRegistry::new();
        reg.put(SessionKey::new("p", "c1", "t"), entry(1, None));
        reg.put(SessionKey::new("p", "c2", "t"), entry(2, None));
        assert_eq!(reg.len(), 2);

        reg.remove(&SessionKey::new("p", "c1", "t"));
        assert_eq!(reg.len(), 1);
        assert!(reg.contains(&SessionKey::new("p", "c2", "t")));
    }

    #[test]
    fn remove_missing_key() {
        let mut reg = SessionRegistry::new();
        assert!(reg.remove(&SessionKey::new("p", "c", "t")).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn empty_history_means_new() {
        assert!(entry(1, Some("")).history_uid.is_none());
        assert_eq!(entry(1, Some("abc")).history_uid.as_deref(), Some("abc"));
    }

    #[test]
    fn rebind_replaces_session() {
        let mut e = entry(1, None);
        let newer = RecordingSession::shared("p", "c", "t");
        e.rebind(newer.clone());
        e.session.send("hi");
        assert_eq!(newer.texts(), vec!["hi".to_string()]);
    }
}
