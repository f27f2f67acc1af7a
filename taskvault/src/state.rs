//! Shared application state.

use std::sync::Arc;

use crate::backend::{AuthApi, Backend, SupabaseBackend, TableApi};
use crate::config::Config;
use crate::error::Result;
use crate::session::SessionManager;
use crate::store::{FileSessionStore, SessionStore};

/// Session manager plus table access, passed explicitly to every consumer.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionManager>,
    pub tables: Arc<dyn TableApi>,
}

impl AppState {
    pub fn new<B>(backend: Arc<B>, store: Arc<dyn SessionStore>) -> Self
    where
        B: Backend + 'static,
    {
        let auth: Arc<dyn AuthApi> = backend.clone();
        let tables: Arc<dyn TableApi> = backend;
        Self {
            session: Arc::new(SessionManager::new(auth, store)),
            tables,
        }
    }

    /// Supabase backend and file-backed session store from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = Arc::new(SupabaseBackend::from_config(config)?);
        let store = FileSessionStore::new(config.session.resolved_path());
        tracing::debug!(
            supabase_url = %config.supabase.url,
            session_file = %store.path().display(),
            "Client configured"
        );
        Ok(Self::new(backend, Arc::new(store)))
    }
}
