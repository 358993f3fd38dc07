//! Session Store
//!
//! Single source of truth for who is signed in, and the gateway for every
//! authenticated row operation.
//!
//! The store is the only writer of two observable values:
//!
//! - the cached [`Identity`] (`None` when signed out)
//! - the "restoration complete" flag, raised exactly once at startup
//!
//! Views read both through `watch` receivers. Backend session changes reach
//! the store through the auth event channel returned by
//! [`SessionStore::initialize`].

use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use super::legacy::{parse_legacy_tokens, LEGACY_TOKEN_KEY};
use crate::backend::{Backend, BackendError};
use crate::error::{Error, Result};
use crate::models::{AppUser, AuthEvent, Expense, Identity, NewExpense, SignInReply};
use crate::storage::KeyValueStore;

/// Local storage key of the `{id, email}` mirror
pub const APP_USER_KEY: &str = "app_user";

/// Session state shared by every view
pub struct SessionStore {
    backend: Arc<dyn Backend>,
    storage: Arc<dyn KeyValueStore>,
    identity: watch::Sender<Option<Identity>>,
    ready: watch::Sender<bool>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn Backend>, storage: Arc<dyn KeyValueStore>) -> Self {
        let (identity, _) = watch::channel(None);
        let (ready, _) = watch::channel(false);

        Self {
            backend,
            storage,
            identity,
            ready,
        }
    }

    // ---------------------------------------------------------------
    // Startup and sync
    // ---------------------------------------------------------------

    /// Restore the session, then subscribe to backend session changes.
    ///
    /// The returned receiver must be drained with [`run_sync`](Self::run_sync)
    /// or [`apply_pending`](Self::apply_pending) for the rest of the process.
    pub async fn initialize(&self) -> broadcast::Receiver<AuthEvent> {
        self.restore().await;
        self.backend.subscribe()
    }

    /// Recover a session from the backend client's own storage, falling back
    /// to the legacy token entry. Never fails; raises the ready flag once done.
    pub async fn restore(&self) {
        match self.backend.get_session().await {
            Ok(Some(session)) => {
                tracing::debug!(user_id = %session.user.id, "Restored persisted session");
                self.store_app_user(&session.user);
                self.set_identity(Some(session.user));
            }
            Ok(None) => self.restore_from_legacy().await,
            Err(e) => {
                tracing::warn!(error = %e, "get_session failed");
                self.restore_from_legacy().await;
            }
        }

        if self.mark_ready() {
            tracing::info!(
                signed_in = self.identity.borrow().is_some(),
                "Session restoration complete"
            );
        }
    }

    async fn restore_from_legacy(&self) {
        let raw = match self.storage.get_item(LEGACY_TOKEN_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read legacy token entry");
                return;
            }
        };

        let Some(tokens) = parse_legacy_tokens(&raw) else {
            tracing::debug!("Legacy token entry holds no usable tokens");
            return;
        };

        match self
            .backend
            .set_session(&tokens.access_token, &tokens.refresh_token)
            .await
        {
            Ok(session) => {
                tracing::info!(user_id = %session.user.id, "Restored session from legacy tokens");
                self.store_app_user(&session.user);
                self.set_identity(Some(session.user));
            }
            Err(e) => tracing::warn!(error = %e, "set_session with legacy tokens failed"),
        }
    }

    /// Raise the ready flag; true only for the call that raised it
    fn mark_ready(&self) -> bool {
        self.ready.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }

    /// Apply one backend session change to the cache and the mirror
    pub fn apply_event(&self, event: &AuthEvent) {
        tracing::debug!(kind = ?event.kind, "Auth state changed");

        let identity = event.identity().cloned();
        match &identity {
            Some(user) => self.store_app_user(user),
            None => self.clear_app_user(),
        }
        self.set_identity(identity);
    }

    /// Apply every session change until the backend drops the channel
    pub async fn run_sync(&self, mut events: broadcast::Receiver<AuthEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.apply_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Auth event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::debug!("Auth event channel closed");
    }

    /// Apply the session changes already queued, without waiting.
    /// Returns how many were applied.
    pub fn apply_pending(&self, events: &mut broadcast::Receiver<AuthEvent>) -> usize {
        let mut applied = 0;
        loop {
            match events.try_recv() {
                Ok(event) => {
                    self.apply_event(&event);
                    applied += 1;
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Auth event subscriber lagged");
                }
                Err(_) => break,
            }
        }
        applied
    }

    // ---------------------------------------------------------------
    // Observables
    // ---------------------------------------------------------------

    /// Cached identity, without a network round trip
    pub fn current_identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    /// Receiver that observes every identity change
    pub fn identity_changes(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Receiver that observes the restoration flag
    pub fn ready_changes(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    /// Resolve once startup restoration has completed
    pub async fn wait_until_ready(&self) {
        let mut ready = self.ready.subscribe();
        // The sender lives as long as `self`, so this only returns once ready
        let _ = ready.wait_for(|ready| *ready).await;
    }

    fn set_identity(&self, identity: Option<Identity>) {
        self.identity.send_if_modified(|current| {
            if *current == identity {
                false
            } else {
                *current = identity;
                true
            }
        });
    }

    // ---------------------------------------------------------------
    // Local mirror
    // ---------------------------------------------------------------

    /// The `{id, email}` mirror, if present and readable
    pub fn stored_app_user(&self) -> Option<AppUser> {
        let raw = self.storage.get_item(APP_USER_KEY).ok()??;
        serde_json::from_str(&raw).ok()
    }

    fn store_app_user(&self, identity: &Identity) {
        let record = AppUser::from(identity);
        let result = serde_json::to_string(&record)
            .map_err(crate::storage::StorageError::from)
            .and_then(|json| self.storage.set_item(APP_USER_KEY, &json));
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to store app user");
        }
    }

    fn clear_app_user(&self) {
        if let Err(e) = self.storage.remove_item(APP_USER_KEY) {
            tracing::warn!(error = %e, "Failed to clear app user");
        }
    }

    // ---------------------------------------------------------------
    // Auth
    // ---------------------------------------------------------------

    /// Password sign-in. Cached state follows through the auth event channel.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SignInReply> {
        self.backend
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Password sign-in failed");
                e.into()
            })
    }

    /// Request a magic link; success only means the request was accepted
    pub async fn sign_in_with_magic_link(&self, email: &str) -> Result<()> {
        self.backend.sign_in_with_otp(email).await.map_err(|e| {
            tracing::warn!(error = %e, "Magic link request failed");
            e.into()
        })
    }

    /// Create an account. The reply has no session while confirmation is pending.
    pub async fn sign_up_with_password(&self, email: &str, password: &str) -> Result<SignInReply> {
        self.backend.sign_up(email, password).await.map_err(|e| {
            tracing::warn!(error = %e, "Sign-up failed");
            e.into()
        })
    }

    /// End the session. Local state is cleared even if the backend call fails.
    pub async fn sign_out(&self) {
        if let Err(e) = self.backend.sign_out().await {
            tracing::warn!(error = %e, "Remote sign-out failed");
        }
        self.clear_app_user();
        self.set_identity(None);
    }

    // ---------------------------------------------------------------
    // Expenses
    // ---------------------------------------------------------------

    /// The signed-in identity's expenses, newest date first.
    /// Empty, without a backend call, when signed out.
    pub async fn list_expenses(&self) -> Result<Vec<Expense>> {
        let Some(identity) = self.current_identity() else {
            return Ok(Vec::new());
        };

        let mut rows = self.backend.select_expenses(&identity.id).await?;
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(rows)
    }

    /// Insert an expense for the signed-in identity and return the stored row
    pub async fn add_expense(&self, expense: &NewExpense) -> Result<Expense> {
        if self.current_identity().is_none() {
            return Err(Error::NotAuthenticated);
        }

        let created = self.backend.insert_expense(expense).await?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("insert returned no rows".to_string()).into())
    }

    /// Delete one of the signed-in identity's expenses
    pub async fn delete_expense(&self, id: &str) -> Result<()> {
        let identity = self.current_identity().ok_or(Error::NotAuthenticated)?;
        self.backend.delete_expense(id, &identity.id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, MemoryBackend};
    use crate::storage::MemoryStorage;
    use std::time::Duration;

    fn setup() -> (Arc<MemoryBackend>, MemoryStorage, SessionStore) {
        let backend = Arc::new(MemoryBackend::new());
        let storage = MemoryStorage::new();
        let store = SessionStore::new(backend.clone(), Arc::new(storage.clone()));
        (backend, storage, store)
    }

    #[tokio::test]
    async fn test_restore_from_backend_session() {
        let (backend, storage, store) = setup();
        let ana = backend.add_account("ana@example.com", "pw");
        backend.persist_session_for("ana@example.com").unwrap();

        store.restore().await;

        assert!(store.is_ready());
        assert_eq!(store.current_identity(), Some(ana.clone()));
        assert_eq!(store.stored_app_user(), Some(AppUser::from(&ana)));
        assert!(storage.get_item(APP_USER_KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_restore_with_nothing_stored() {
        let (backend, _storage, store) = setup();

        store.restore().await;

        assert!(store.is_ready());
        assert_eq!(store.current_identity(), None);
        assert_eq!(backend.calls(), vec![BackendCall::GetSession]);
    }

    #[tokio::test]
    async fn test_restore_from_legacy_tokens() {
        let shapes: [fn(&str, &str) -> String; 4] = [
            |a, r| format!(r#"{{"access_token": "{a}", "refresh_token": "{r}"}}"#),
            |a, r| format!(r#"{{"accessToken": "{a}", "refreshToken": "{r}"}}"#),
            |a, r| format!(r#"{{"currentSession": {{"access_token": "{a}", "refresh_token": "{r}"}}}}"#),
            |a, r| format!(r#"{{"current_session": {{"accessToken": "{a}", "refreshToken": "{r}"}}}}"#),
        ];

        for shape in shapes {
            let (backend, storage, store) = setup();
            let ana = backend.add_account("ana@example.com", "pw");
            let (access, refresh) = backend.issue_tokens("ana@example.com").unwrap();
            let raw = shape(&access, &refresh);
            storage.set_item(LEGACY_TOKEN_KEY, &raw).unwrap();

            store.restore().await;

            assert!(store.is_ready());
            assert_eq!(store.current_identity(), Some(ana.clone()), "shape: {raw}");
            assert_eq!(store.stored_app_user().map(|u| u.id), Some(ana.id.clone()));
        }
    }

    #[tokio::test]
    async fn test_malformed_legacy_value_degrades_to_signed_out() {
        for raw in ["", "garbage", "{\"access_token\": 5}", "null", "{\"currentSession\": {}}"] {
            let (backend, storage, store) = setup();
            storage.set_item(LEGACY_TOKEN_KEY, raw).unwrap();

            store.restore().await;

            assert!(store.is_ready());
            assert_eq!(store.current_identity(), None);
            assert!(!backend.calls().contains(&BackendCall::SetSession));
        }
    }

    #[tokio::test]
    async fn test_get_session_failure_still_tries_legacy() {
        let (backend, storage, store) = setup();
        let ana = backend.add_account("ana@example.com", "pw");
        let (access, refresh) = backend.issue_tokens("ana@example.com").unwrap();
        storage
            .set_item(
                LEGACY_TOKEN_KEY,
                &format!(r#"{{"access_token":"{access}","refresh_token":"{refresh}"}}"#),
            )
            .unwrap();
        backend.set_fail_get_session(true);

        store.restore().await;

        assert_eq!(store.current_identity(), Some(ana));
        assert!(store.is_ready());
    }

    #[tokio::test]
    async fn test_rejected_legacy_tokens() {
        let (backend, storage, store) = setup();
        backend.add_account("ana@example.com", "pw");
        storage
            .set_item(LEGACY_TOKEN_KEY, r#"{"access_token":"a","refresh_token":"stale"}"#)
            .unwrap();

        store.restore().await;

        assert!(store.is_ready());
        assert_eq!(store.current_identity(), None);
        assert!(backend.calls().contains(&BackendCall::SetSession));
    }

    #[tokio::test]
    async fn test_ready_is_raised_once() {
        let (_backend, _storage, store) = setup();
        let mut ready = store.ready_changes();
        assert!(!*ready.borrow_and_update());

        store.restore().await;
        assert!(ready.has_changed().unwrap());
        assert!(*ready.borrow_and_update());

        store.restore().await;
        assert!(!ready.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_wait_until_ready() {
        let (_backend, _storage, store) = setup();
        let store = Arc::new(store);

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.wait_until_ready().await })
        };
        store.restore().await;

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn test_apply_pending_follows_sign_in_and_out() {
        let (backend, storage, store) = setup();
        let ana = backend.add_account("ana@example.com", "pw");
        let mut events = store.initialize().await;

        let reply = store
            .sign_in_with_password("ana@example.com", "pw")
            .await
            .unwrap();
        assert!(reply.session.is_some());
        // Cached state only moves once the event is applied
        assert_eq!(store.current_identity(), None);

        assert_eq!(store.apply_pending(&mut events), 1);
        assert_eq!(store.current_identity(), Some(ana.clone()));
        assert!(storage.get_item(APP_USER_KEY).unwrap().is_some());

        backend.revoke_session();
        store.apply_pending(&mut events);
        assert_eq!(store.current_identity(), None);
        assert_eq!(storage.get_item(APP_USER_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_run_sync_in_background() {
        let (backend, _storage, store) = setup();
        let ana = backend.add_account("ana@example.com", "pw");
        let store = Arc::new(store);

        let events = store.initialize().await;
        let mut identity = store.identity_changes();
        let sync = {
            let store = store.clone();
            tokio::spawn(async move { store.run_sync(events).await })
        };

        store
            .sign_in_with_password("ana@example.com", "pw")
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(1), identity.wait_for(|i| i.is_some()))
            .await
            .expect("identity should update")
            .unwrap();
        assert_eq!(store.current_identity(), Some(ana));

        sync.abort();
    }

    #[tokio::test]
    async fn test_sign_out_clears_cache_and_mirror() {
        let (backend, storage, store) = setup();
        backend.add_account("ana@example.com", "pw");
        backend.persist_session_for("ana@example.com").unwrap();
        store.restore().await;
        assert!(store.current_identity().is_some());

        store.sign_out().await;

        assert_eq!(store.current_identity(), None);
        assert_eq!(store.stored_app_user(), None);
        assert_eq!(storage.get_item(APP_USER_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_crud_without_identity_never_reaches_backend() {
        let (backend, _storage, store) = setup();
        store.restore().await;
        backend.clear_calls();

        assert!(store.list_expenses().await.unwrap().is_empty());

        let expense = NewExpense {
            title: "Tea".to_string(),
            amount: 2.0,
            category: None,
            date: chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        };
        assert!(matches!(
            store.add_expense(&expense).await,
            Err(Error::NotAuthenticated)
        ));
        assert!(matches!(
            store.delete_expense("1").await,
            Err(Error::NotAuthenticated)
        ));

        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_unreadable_mirror_reads_as_none() {
        let (_backend, storage, store) = setup();
        storage.set_item(APP_USER_KEY, "{broken").unwrap();
        assert_eq!(store.stored_app_user(), None);
    }
}
