//! Browsing sessions and their option overlays.
//!
//! Each session owns one context in the [`OptionStore`]: options the session
//! changes are shadowed into the context's overlay tree and never leak into
//! other sessions or into the canonical settings.
//!
//! # Session lifecycle (for beginners)
//!
//! ```text
//! open ──► set options in context ──► close
//!                                       │
//!                          overlay tree freed, id forgotten
//! ```
//!
//! The session id doubles as the store's [`ContextId`], so hook calls that
//! carry a context can be mapped straight back to the session.

use std::collections::HashMap;

use optree_core::{ContextId, OptionStore};
use tracing::info;

use super::error::HostError;

/// Identifies a session.  Same value as its store context.
pub type SessionId = ContextId;

/// What the host knows about one open session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub title: String,
}

/// In-memory registry of open sessions.
///
/// A `HashMap<SessionId, Session>` gives O(1) lookup by id; [`all`](Self::all)
/// sorts by title for display.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session with a fresh context in `store`.
    pub fn open(&mut self, store: &mut OptionStore, title: impl Into<String>) -> SessionId {
        let id = store.open_context();
        let session = Session { id, title: title.into() };
        info!(session = %id, title = %session.title, "opened session");
        self.sessions.insert(id, session);
        id
    }

    /// Closes a session and frees its overlay.  Returns the number of overlay
    /// nodes freed.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::UnknownSession`] when the session is not open.
    pub fn close(&mut self, store: &mut OptionStore, id: SessionId) -> Result<usize, HostError> {
        self.sessions.remove(&id).ok_or(HostError::UnknownSession(id))?;
        Ok(store.close_context(id)?)
    }

    /// Closes every session.  Returns the total number of overlay nodes freed.
    pub fn close_all(&mut self, store: &mut OptionStore) -> usize {
        self.sessions
            .drain()
            .filter_map(|(id, _)| store.close_context(id).ok())
            .sum()
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Returns a snapshot of all sessions, sorted by title.
    pub fn all(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        sessions
    }

    pub fn rename(&mut self, id: SessionId, title: impl Into<String>) -> Result<(), HostError> {
        let session = self.sessions.get_mut(&id).ok_or(HostError::UnknownSession(id))?;
        session.title = title.into();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use optree_core::{OptionNode, OptionTree, OptionValue};
    use uuid::Uuid;

    use super::*;

    fn store() -> OptionStore {
        let mut tree = OptionTree::new("config");
        let root = tree.root();
        let document = tree.insert(root, OptionNode::tree("document")).unwrap();
        tree.insert(document, OptionNode::new("margin", OptionValue::Int(3)).with_bounds(0, 9)).unwrap();
        OptionStore::new(tree)
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.all().is_empty());
    }

    #[test]
    fn test_open_creates_store_context() {
        // Arrange
        let mut store = store();
        let mut registry = SessionRegistry::new();

        // Act
        let id = registry.open(&mut store, "news");

        // Assert
        assert_eq!(registry.get(id).map(|s| s.title.as_str()), Some("news"));
        assert!(store.context_tree(id).is_some());
    }

    #[test]
    fn test_all_is_sorted_by_title() {
        let mut store = store();
        let mut registry = SessionRegistry::new();
        registry.open(&mut store, "zebra");
        registry.open(&mut store, "alpha");

        let titles: Vec<_> = registry.all().into_iter().map(|s| s.title).collect();

        assert_eq!(titles, vec!["alpha", "zebra"]);
    }

    #[test]
    fn test_close_frees_overlay_and_forgets_session() {
        // Arrange
        let mut store = store();
        let mut registry = SessionRegistry::new();
        let id = registry.open(&mut store, "tab");
        store.set_value("document.margin", OptionValue::Int(5), Some(id)).unwrap();

        // Act
        let freed = registry.close(&mut store, id).unwrap();

        // Assert
        assert_eq!(freed, 2);
        assert!(registry.get(id).is_none());
        assert!(store.context_tree(id).is_none());
        assert!(matches!(registry.close(&mut store, id), Err(HostError::UnknownSession(_))));
    }

    #[test]
    fn test_rename_unknown_session_fails() {
        let mut registry = SessionRegistry::new();
        assert!(registry.rename(Uuid::new_v4(), "x").is_err());
    }

    #[test]
    fn test_close_all_closes_every_context() {
        let mut store = store();
        let mut registry = SessionRegistry::new();
        let first = registry.open(&mut store, "a");
        let second = registry.open(&mut store, "b");
        store.materialize("document.margin", first).unwrap();
        store.materialize("document.margin", second).unwrap();

        let freed = registry.close_all(&mut store);

        assert_eq!(freed, 4);
        assert!(registry.is_empty());
        assert_eq!(store.contexts().count(), 0);
    }
}
