//! Global Application State
//!
//! Reactive mirrors of the session store's observables, plus the success toast.

use leptos::*;
use std::sync::Arc;

use spendbook::{BackendConfig, Identity, SessionStore, SupabaseClient};

use crate::storage::WebStorage;

/// Global application state provided to all components
#[derive(Clone)]
pub struct AppState {
    /// Session store shared by every page
    pub store: Arc<SessionStore>,
    /// Signed-in identity, following the store
    pub user: RwSignal<Option<Identity>>,
    /// Startup restoration finished
    pub ready: RwSignal<bool>,
    /// Success message (for toasts)
    pub success: RwSignal<Option<String>>,
}

/// Backend settings baked in at compile time
fn backend_config() -> Result<BackendConfig, String> {
    let url = option_env!("SPENDBOOK_SUPABASE_URL").unwrap_or_default();
    let key = option_env!("SPENDBOOK_SUPABASE_ANON_KEY").unwrap_or_default();

    if url.is_empty() {
        return Err("SPENDBOOK_SUPABASE_URL was not set at build time".to_string());
    }
    if key.is_empty() {
        return Err("SPENDBOOK_SUPABASE_ANON_KEY was not set at build time".to_string());
    }
    Ok(BackendConfig::new(url, key))
}

/// Build the session store, start restoration and sync, and provide the
/// state to the component tree
pub fn provide_app_state() -> Result<AppState, String> {
    let config = backend_config()?;
    let storage = Arc::new(WebStorage);
    let backend = SupabaseClient::new(config, storage.clone()).map_err(|e| e.to_string())?;
    let store = Arc::new(SessionStore::new(Arc::new(backend), storage));

    let state = AppState {
        store,
        user: create_rw_signal(None),
        ready: create_rw_signal(false),
        success: create_rw_signal(None),
    };

    start_session(&state);
    provide_context(state.clone());
    Ok(state)
}

/// Restore the session, then keep the signals in step with the store
fn start_session(state: &AppState) {
    let store = state.store.clone();
    let user = state.user;
    let ready = state.ready;

    spawn_local(async move {
        let events = store.initialize().await;
        ready.set(true);

        // Identity signal follows every change the store publishes
        let mut identity = store.identity_changes();
        spawn_local(async move {
            loop {
                let current = identity.borrow_and_update().clone();
                user.set(current);
                if identity.changed().await.is_err() {
                    break;
                }
            }
        });

        store.run_sync(events).await;
    });
}

/// Fetch the global state
pub fn use_app_state() -> AppState {
    expect_context::<AppState>()
}

impl AppState {
    /// Show a success message (auto-clears after timeout)
    pub fn show_success(&self, message: &str) {
        self.success.set(Some(message.to_string()));

        let success_signal = self.success;
        gloo_timers::callback::Timeout::new(3000, move || {
            success_signal.set(None);
        })
        .forget();
    }
}

/// Blocking browser alert
pub fn alert(message: &str) {
    web_sys::console::error_1(&message.into());
    let _ = window().alert_with_message(message);
}

/// Blocking browser confirmation
pub fn confirm(message: &str) -> bool {
    window().confirm_with_message(message).unwrap_or(false)
}
