//! End-to-end session and expense flows against the in-memory backend

use chrono::NaiveDate;
use spendbook::backend::BackendCall;
use spendbook::session::{APP_USER_KEY, LEGACY_TOKEN_KEY};
use spendbook::{
    ExpensesView, FileStorage, Identity, KeyValueStore, LoginAction, LoginForm, LoginView,
    MemoryBackend, MemoryStorage, NewExpense, RootLayout, Route, SessionStore,
};
use std::sync::Arc;

struct Harness {
    backend: Arc<MemoryBackend>,
    storage: MemoryStorage,
    store: SessionStore,
}

impl Harness {
    fn new() -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let storage = MemoryStorage::new();
        let store = SessionStore::new(backend.clone(), Arc::new(storage.clone()));
        Self {
            backend,
            storage,
            store,
        }
    }

    fn row_calls(&self) -> Vec<BackendCall> {
        self.backend
            .calls()
            .into_iter()
            .filter(BackendCall::is_row_call)
            .collect()
    }
}

fn expense(title: &str, date: &str) -> NewExpense {
    NewExpense {
        title: title.to_string(),
        amount: 4.5,
        category: None,
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
    }
}

async fn sign_in(h: &Harness) -> Identity {
    let ana = h.backend.add_account("ana@example.com", "pw");
    let mut events = h.store.initialize().await;
    h.store
        .sign_in_with_password("ana@example.com", "pw")
        .await
        .unwrap();
    h.store.apply_pending(&mut events);
    ana
}

#[tokio::test]
async fn malformed_legacy_values_leave_user_signed_out() {
    for raw in [
        "",
        "{",
        "[1,2]",
        "{\"accessToken\":\"a\"}",
        "{\"current_session\":{\"refresh_token\":\"r\"}}",
    ] {
        let h = Harness::new();
        h.storage.set_item(LEGACY_TOKEN_KEY, raw).unwrap();

        let _events = h.store.initialize().await;

        assert!(h.store.is_ready(), "{raw:?}");
        assert_eq!(h.store.current_identity(), None, "{raw:?}");
    }
}

#[tokio::test]
async fn sign_out_clears_identity_mirror_and_rows() {
    let h = Harness::new();
    sign_in(&h).await;
    assert!(h.storage.get_item(APP_USER_KEY).unwrap().is_some());

    h.store.sign_out().await;
    h.backend.clear_calls();

    assert_eq!(h.store.current_identity(), None);
    assert_eq!(h.storage.get_item(APP_USER_KEY).unwrap(), None);
    assert!(h.store.list_expenses().await.unwrap().is_empty());
    assert!(h.row_calls().is_empty());
}

#[tokio::test]
async fn listing_is_newest_first_and_scoped_to_owner() {
    let h = Harness::new();
    let bob = h.backend.add_account("bob@example.com", "pw");
    h.backend.seed_expense(&bob.id, expense("bob's", "2024-06-01"));
    let ana = sign_in(&h).await;

    for (title, date) in [("b", "2024-02-10"), ("c", "2024-03-01"), ("a", "2024-01-31")] {
        h.store.add_expense(&expense(title, date)).await.unwrap();
    }

    let listed = h.store.list_expenses().await.unwrap();
    let titles: Vec<_> = listed.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, ["c", "b", "a"]);
    assert!(listed.iter().all(|e| e.user_id == ana.id));
}

#[test]
fn insert_payload_carries_no_owner() {
    let json = serde_json::to_value(expense("x", "2024-01-01")).unwrap();
    let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
    assert!(!keys.iter().any(|k| k == "user_id"), "{keys:?}");
}

#[tokio::test]
async fn add_then_list_contains_record_once() {
    let h = Harness::new();
    sign_in(&h).await;

    let created = h.store.add_expense(&expense("Tea", "2024-05-05")).await.unwrap();
    let listed = h.store.list_expenses().await.unwrap();

    assert_eq!(listed.iter().filter(|e| e.id == created.id).count(), 1);
}

#[tokio::test]
async fn delete_removes_only_matching_own_record() {
    let h = Harness::new();
    let bob = h.backend.add_account("bob@example.com", "pw");
    let foreign = h.backend.seed_expense(&bob.id, expense("bob's", "2024-06-01"));
    sign_in(&h).await;

    let keep = h.store.add_expense(&expense("keep", "2024-05-01")).await.unwrap();
    let gone = h.store.add_expense(&expense("gone", "2024-05-02")).await.unwrap();

    h.store.delete_expense(&gone.id).await.unwrap();
    let after_delete = h.store.list_expenses().await.unwrap();
    assert_eq!(after_delete, vec![keep.clone()]);

    // Missing and foreign ids change nothing
    h.store.delete_expense("no-such-id").await.unwrap();
    h.store.delete_expense(&foreign.id).await.unwrap();
    assert_eq!(h.store.list_expenses().await.unwrap(), vec![keep]);
    assert_eq!(h.backend.rows().len(), 2);
}

#[tokio::test]
async fn invalid_login_email_makes_no_backend_call() {
    let h = Harness::new();
    let _events = h.store.initialize().await;
    h.backend.clear_calls();

    let mut view = LoginView::new();
    view.form = LoginForm::new("ana-at-example.com", "pw");
    assert_eq!(view.submit(&h.store, LoginAction::SignIn).await, None);

    assert!(view.is_invalid());
    assert!(h.backend.calls().is_empty());
}

#[test]
fn layout_breakpoint() {
    assert!(RootLayout::new(500).is_sidebar_collapsed());

    let mut wide = RootLayout::new(1200);
    let before = wide;
    wide.on_resize(1200);
    assert_eq!(wide, before);
}

#[tokio::test]
async fn session_survives_restart_through_file_storage() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(MemoryBackend::new());
    let ana = backend.add_account("ana@example.com", "pw");

    {
        let storage = Arc::new(FileStorage::in_dir(dir.path()).unwrap());
        let store = SessionStore::new(backend.clone(), storage);
        let mut events = store.initialize().await;
        store
            .sign_in_with_password("ana@example.com", "pw")
            .await
            .unwrap();
        store.apply_pending(&mut events);
    }

    let storage = Arc::new(FileStorage::in_dir(dir.path()).unwrap());
    let store = SessionStore::new(backend, storage);
    assert_eq!(
        store.stored_app_user().map(|u| u.email),
        Some(ana.email.clone())
    );

    let _events = store.initialize().await;
    let mut view = ExpensesView::new();
    assert_ne!(view.activate(&store).await, Some(Route::Login));
    assert_eq!(view.user, Some(ana));
}
