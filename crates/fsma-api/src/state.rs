//! # Application State
//!
//! Shared state for the Axum application: in-memory entity stores and
//! runtime configuration.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use fsma_state::{Document, License};

/// Thread-safe in-memory store keyed by UUID.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Update a record in place under the write lock, letting `f` reject
    /// the update. Returns `None` if the key is absent.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token`.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared bearer secret. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
}

impl AppConfig {
    /// Read `PORT` and `AUTH_TOKEN` from the environment.
    ///
    /// An unparsable `PORT` falls back to 8080.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let auth_token = std::env::var("AUTH_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        Self { port, auth_token }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
        }
    }
}

/// Shared application state. Cloning shares the underlying stores.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub documents: Store<Document>,
    pub licenses: Store<License>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_insert_get_update() {
        let store: Store<String> = Store::new();
        let id = Uuid::new_v4();
        assert!(store.insert(id, "a".to_string()).is_none());
        assert_eq!(store.get(&id).as_deref(), Some("a"));
        let updated = store.try_update(&id, |v| {
            v.push('b');
            Ok::<_, ()>(v.len())
        });
        assert_eq!(updated, Some(Ok(2)));
        assert_eq!(store.get(&id).as_deref(), Some("ab"));
        assert!(store
            .try_update(&Uuid::new_v4(), |_| Ok::<_, ()>(()))
            .is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn rejected_update_leaves_record_unchanged() {
        let store: Store<u32> = Store::new();
        let id = Uuid::new_v4();
        store.insert(id, 1);
        let result = store.try_update(&id, |v| if *v == 0 { Ok(()) } else { Err("stale") });
        assert_eq!(result, Some(Err("stale")));
        assert_eq!(store.get(&id), Some(1));
    }

    #[test]
    fn store_clones_share_data() {
        let store: Store<u32> = Store::new();
        let other = store.clone();
        store.insert(Uuid::new_v4(), 7);
        assert_eq!(other.list(), vec![7]);
    }

    #[test]
    fn config_debug_redacts_token() {
        let config = AppConfig {
            port: 9000,
            auth_token: Some("hunter2".to_string()),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("9000"));
    }

    #[test]
    fn state_clones_share_stores() {
        let state = AppState::new();
        let clone = state.clone();
        let doc = Document::new("Roadmap", "mia");
        state.documents.insert(doc.id, doc.clone());
        assert!(clone.documents.get(&doc.id).is_some());
    }
}
