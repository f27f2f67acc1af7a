//! Session manager: tracks the current identity and publishes its changes.

use std::sync::Arc;

use futures_util::{future, stream::BoxStream, StreamExt};
use taskvault_common::{AuthEventKind, Identity, IdentityChange, Session};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;

use crate::backend::{AuthApi, Credentials, SignUp};
use crate::error::{Error, Result};
use crate::store::SessionStore;

/// Pending notifications kept per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 16;

enum SessionState {
    Unresolved,
    Resolved(Option<Session>),
}

impl SessionState {
    fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Resolved(Some(session)) => Some(session),
            _ => None,
        }
    }
}

/// Owns the current session and the identity-change event source.
///
/// Shared by reference (`Arc<SessionManager>`) with every consumer that needs
/// the identity; there is no global instance.
pub struct SessionManager {
    auth: Arc<dyn AuthApi>,
    store: Arc<dyn SessionStore>,
    state: RwLock<SessionState>,
    events: broadcast::Sender<IdentityChange>,
}

impl SessionManager {
    pub fn new(auth: Arc<dyn AuthApi>, store: Arc<dyn SessionStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            auth,
            store,
            state: RwLock::new(SessionState::Unresolved),
            events,
        }
    }

    /// Resolve the identity from the persisted session.
    ///
    /// A live session is checked against the auth service; an expired or
    /// rejected one is refreshed once. The store is cleared only when the
    /// backend turns the session down. If the backend cannot be reached, an
    /// expired session resolves to none for this run and stays stored.
    /// Subsequent calls return the already-resolved identity.
    pub async fn resolve(&self) -> Option<Identity> {
        if let SessionState::Resolved(session) = &*self.state.read().await {
            return session.as_ref().map(|s| s.user.clone());
        }

        let stored = self.store.load().unwrap_or_else(|e| {
            tracing::warn!("Could not read persisted session: {}", e);
            None
        });

        let session = match stored {
            None => None,
            Some(session) if session.is_expired() => {
                tracing::debug!("Persisted session expired, refreshing");
                self.restore_by_refresh(&session).await
            }
            Some(session) => match self.auth.get_user(&session.access_token).await {
                Ok(user) => Some(Session { user, ..session }),
                Err(e) if e.is_rejection() => {
                    tracing::debug!("Persisted session rejected, refreshing: {}", e);
                    self.restore_by_refresh(&session).await
                }
                Err(e) => {
                    tracing::warn!("Could not verify persisted session: {}", e);
                    Some(session)
                }
            },
        };

        let identity = session.as_ref().map(|s| s.user.clone());
        *self.state.write().await = SessionState::Resolved(session);
        self.publish(AuthEventKind::InitialSession, identity.clone());
        identity
    }

    pub async fn is_resolved(&self) -> bool {
        matches!(&*self.state.read().await, SessionState::Resolved(_))
    }

    /// The presently authenticated identity, or `None` (also while unresolved).
    pub async fn current_identity(&self) -> Option<Identity> {
        self.state.read().await.session().map(|s| s.user.clone())
    }

    /// Bearer token for table calls, refreshed first if it has expired.
    pub async fn access_token(&self) -> Result<String> {
        let session = self
            .state
            .read()
            .await
            .session()
            .cloned()
            .ok_or(Error::NotSignedIn)?;

        if session.is_expired() {
            self.refresh().await?;
            return self
                .state
                .read()
                .await
                .session()
                .map(|s| s.access_token.clone())
                .ok_or(Error::NotSignedIn);
        }

        Ok(session.access_token)
    }

    /// Stream of identity changes published after this call.
    pub fn changes(&self) -> BoxStream<'static, IdentityChange> {
        BroadcastStream::new(self.events.subscribe())
            .filter_map(|event| {
                future::ready(match event {
                    Ok(change) => Some(change),
                    Err(e) => {
                        tracing::warn!("Identity subscriber lagged: {}", e);
                        None
                    }
                })
            })
            .boxed()
    }

    /// Invoke `callback` for every identity change until the returned
    /// subscription is unsubscribed or dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe_to_changes<F>(&self, callback: F) -> Subscription
    where
        F: Fn(IdentityChange) + Send + 'static,
    {
        let mut changes = self.changes();
        let task = tokio::spawn(async move {
            while let Some(change) = changes.next().await {
                callback(change);
            }
        });
        Subscription { task: Some(task) }
    }

    /// Request account creation.
    ///
    /// When the backend returns a session right away (no confirmation step),
    /// the new identity becomes current and subscribers are notified.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp> {
        let sign_up = self
            .auth
            .sign_up(&Credentials::new(email, password))
            .await?;

        if let Some(session) = &sign_up.session {
            self.install(session.clone(), AuthEventKind::SignedIn).await;
        }
        Ok(sign_up)
    }

    /// Authenticate with existing credentials. On failure the current
    /// identity is left untouched.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let session = self
            .auth
            .sign_in_with_password(&Credentials::new(email, password))
            .await?;
        let identity = session.user.clone();

        tracing::info!(user_id = %identity.id, "Signed in");
        self.install(session, AuthEventKind::SignedIn).await;
        Ok(identity)
    }

    /// Invalidate the current session.
    ///
    /// The local session is dropped and subscribers see "no identity" even
    /// when the remote logout fails.
    pub async fn sign_out(&self) {
        let previous = {
            let mut state = self.state.write().await;
            let previous = state.session().cloned();
            *state = SessionState::Resolved(None);
            previous
        };
        self.forget();

        let Some(session) = previous else {
            return;
        };

        if let Err(e) = self.auth.sign_out(&session.access_token).await {
            tracing::warn!("Remote sign-out failed: {}", e);
        }
        tracing::info!(user_id = %session.user.id, "Signed out");
        self.publish(AuthEventKind::SignedOut, None);
    }

    /// Exchange the refresh token for a new session. Subscribers are only
    /// notified when a different user comes back.
    pub async fn refresh(&self) -> Result<Identity> {
        let current = self
            .state
            .read()
            .await
            .session()
            .cloned()
            .ok_or(Error::NotSignedIn)?;

        let fresh = self.auth.refresh_session(&current.refresh_token).await?;
        let identity = fresh.user.clone();
        let changed = identity != current.user;

        *self.state.write().await = SessionState::Resolved(Some(fresh.clone()));
        self.persist(&fresh);
        tracing::debug!(user_id = %identity.id, "Session refreshed");

        if changed {
            self.publish(AuthEventKind::TokenRefreshed, Some(identity.clone()));
        }
        Ok(identity)
    }

    async fn restore_by_refresh(&self, stored: &Session) -> Option<Session> {
        match self.auth.refresh_session(&stored.refresh_token).await {
            Ok(fresh) => {
                self.persist(&fresh);
                Some(fresh)
            }
            Err(e) if e.is_rejection() => {
                tracing::info!("Dropping persisted session: {}", e);
                self.forget();
                None
            }
            Err(e) => {
                tracing::warn!("Could not refresh persisted session, keeping it: {}", e);
                None
            }
        }
    }

    async fn install(&self, session: Session, kind: AuthEventKind) {
        let identity = session.user.clone();
        self.persist(&session);
        *self.state.write().await = SessionState::Resolved(Some(session));
        self.publish(kind, Some(identity));
    }

    fn persist(&self, session: &Session) {
        if let Err(e) = self.store.save(session) {
            tracing::warn!("Could not persist session: {}", e);
        }
    }

    fn forget(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!("Could not clear persisted session: {}", e);
        }
    }

    fn publish(&self, kind: AuthEventKind, identity: Option<Identity>) {
        tracing::debug!(event = %kind, "Identity change");
        // No receivers is fine: nobody is listening yet.
        let _ = self.events.send(IdentityChange::new(kind, identity));
    }
}

/// Handle to a callback registered with [`SessionManager::subscribe_to_changes`].
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stop receiving notifications and release the listener task.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::store::MemorySessionStore;

    fn manager(backend: Arc<MemoryBackend>) -> SessionManager {
        SessionManager::new(backend, Arc::new(MemorySessionStore::new()))
    }

    #[tokio::test]
    async fn test_unresolved_until_resolve() {
        let session = manager(Arc::new(MemoryBackend::new()));
        assert!(!session.is_resolved().await);
        assert!(session.resolve().await.is_none());
        assert!(session.is_resolved().await);
    }

    #[tokio::test]
    async fn test_sign_in_failure_leaves_identity_none() {
        let backend = Arc::new(MemoryBackend::new());
        let session = manager(backend);
        session.resolve().await;

        let err = session.sign_in("a@x.com", "nope-nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
        assert!(session.current_identity().await.is_none());
        assert!(matches!(
            session.access_token().await,
            Err(Error::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn test_sign_out_without_session_publishes_nothing() {
        let session = manager(Arc::new(MemoryBackend::new()));
        session.resolve().await;

        let mut changes = session.changes();
        session.sign_out().await;
        session.sign_in("a@x.com", "x").await.ok();

        let next =
            tokio::time::timeout(std::time::Duration::from_millis(50), changes.next()).await;
        assert!(next.is_err());
    }

    #[tokio::test]
    async fn test_expired_access_token_is_refreshed_on_use() {
        let backend = Arc::new(MemoryBackend::new().with_token_lifetime(0));
        let session = manager(backend);
        session.resolve().await;
        session.sign_up("a@x.com", "pw123456").await.unwrap();

        let first = session.access_token().await.unwrap();
        let second = session.access_token().await.unwrap();
        assert_ne!(first, second);
    }
}
