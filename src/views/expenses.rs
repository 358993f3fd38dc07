//! Expense list view model

use chrono::NaiveDate;

use super::resolve_identity;
use crate::error::Result;
use crate::forms::{today, ExpenseForm, FormErrors};
use crate::models::{Expense, Identity, NewExpense};
use crate::routes::Route;
use crate::session::SessionStore;

/// Prompt shown before deleting
pub const CONFIRM_DELETE: &str = "Delete this expense?";

const LOAD_FAILED: &str = "Failed to load expenses";
const ADD_FAILED: &str = "Add failed";
const DELETE_FAILED: &str = "Delete failed";

#[derive(Debug, Clone, Default)]
pub struct ExpensesView {
    pub form: ExpenseForm,
    pub expenses: Vec<Expense>,
    pub user: Option<Identity>,
    pub loading: bool,
    form_errors: FormErrors,
    alert: Option<String>,
}

impl ExpensesView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form_errors(&self) -> &FormErrors {
        &self.form_errors
    }

    /// Pending alert, cleared on read
    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    // ---------------------------------------------------------------
    // Activation
    // ---------------------------------------------------------------

    /// Record the identity seen at activation; `Some(Route::Login)` when
    /// nobody is signed in
    pub fn begin_activate(&mut self, identity: Option<Identity>) -> Option<Route> {
        self.user = identity;
        match self.user {
            Some(_) => None,
            None => Some(Route::Login),
        }
    }

    /// Wait for restoration, then redirect or load
    pub async fn activate(&mut self, store: &SessionStore) -> Option<Route> {
        let identity = resolve_identity(store).await;
        if let Some(route) = self.begin_activate(identity) {
            return Some(route);
        }
        self.load(store).await;
        None
    }

    /// Follow identity changes after activation
    pub fn on_identity_change(&mut self, identity: Option<Identity>) {
        self.user = identity;
    }

    // ---------------------------------------------------------------
    // Load
    // ---------------------------------------------------------------

    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    pub fn finish_load(&mut self, result: Result<Vec<Expense>>) {
        self.loading = false;
        match result {
            Ok(expenses) => self.expenses = expenses,
            Err(e) => {
                tracing::error!(error = %e, "Loading expenses failed");
                self.alert = Some(LOAD_FAILED.to_string());
            }
        }
    }

    pub async fn load(&mut self, store: &SessionStore) {
        self.begin_load();
        let result = store.list_expenses().await;
        self.finish_load(result);
    }

    // ---------------------------------------------------------------
    // Add
    // ---------------------------------------------------------------

    /// Validate the form; `None` when invalid, which must not reach the backend
    pub fn begin_add(&mut self) -> Option<NewExpense> {
        match self.form.validate() {
            Ok(expense) => {
                self.form_errors = FormErrors::default();
                self.loading = true;
                Some(expense)
            }
            Err(errors) => {
                self.form_errors = errors;
                None
            }
        }
    }

    /// Returns true when the list should be reloaded
    pub fn finish_add(&mut self, result: Result<Expense>, today: NaiveDate) -> bool {
        self.loading = false;
        match result {
            Ok(expense) => {
                tracing::debug!(id = %expense.id, "Expense added");
                self.form.reset(today);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Adding expense failed");
                self.alert = Some(e.message_or(ADD_FAILED));
                false
            }
        }
    }

    pub async fn add(&mut self, store: &SessionStore) {
        let Some(expense) = self.begin_add() else {
            return;
        };
        let result = store.add_expense(&expense).await;
        if self.finish_add(result, today()) {
            self.load(store).await;
        }
    }

    // ---------------------------------------------------------------
    // Delete
    // ---------------------------------------------------------------

    /// Returns true when the list should be reloaded
    pub fn finish_remove(&mut self, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Deleting expense failed");
                self.alert = Some(e.message_or(DELETE_FAILED));
                false
            }
        }
    }

    /// Delete `id` once `confirm` accepts [`CONFIRM_DELETE`]
    pub async fn remove(
        &mut self,
        store: &SessionStore,
        id: &str,
        confirm: impl FnOnce(&str) -> bool,
    ) {
        if !confirm(CONFIRM_DELETE) {
            return;
        }
        let result = store.delete_expense(id).await;
        if self.finish_remove(result) {
            self.load(store).await;
        }
    }

    // ---------------------------------------------------------------
    // Logout
    // ---------------------------------------------------------------

    pub async fn logout(&mut self, store: &SessionStore) -> Route {
        store.sign_out().await;
        self.user = None;
        self.expenses.clear();
        Route::Login
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, MemoryBackend};
    use crate::storage::MemoryStorage;
    use std::sync::Arc;

    async fn signed_in() -> (Arc<MemoryBackend>, SessionStore, Identity) {
        let backend = Arc::new(MemoryBackend::new());
        let ana = backend.add_account("ana@example.com", "pw");
        backend.persist_session_for("ana@example.com").unwrap();
        let store = SessionStore::new(backend.clone(), Arc::new(MemoryStorage::new()));
        store.restore().await;
        (backend, store, ana)
    }

    fn fill(view: &mut ExpensesView, title: &str, amount: &str, date: &str) {
        view.form.title = title.to_string();
        view.form.amount = amount.to_string();
        view.form.date = date.to_string();
    }

    #[tokio::test]
    async fn test_activate_without_identity_redirects() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SessionStore::new(backend.clone(), Arc::new(MemoryStorage::new()));
        store.restore().await;

        let mut view = ExpensesView::new();
        assert_eq!(view.activate(&store).await, Some(Route::Login));
        assert!(!backend.calls().iter().any(BackendCall::is_row_call));
    }

    #[tokio::test]
    async fn test_activate_loads() {
        let (backend, store, ana) = signed_in().await;
        backend.seed_expense(
            &ana.id,
            NewExpense {
                title: "Rent".to_string(),
                amount: 900.0,
                category: None,
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            },
        );

        let mut view = ExpensesView::new();
        assert_eq!(view.activate(&store).await, None);
        assert_eq!(view.user, Some(ana));
        assert_eq!(view.expenses.len(), 1);
        assert!(!view.loading);
    }

    #[tokio::test]
    async fn test_add_resets_form_and_reloads() {
        let (_backend, store, _ana) = signed_in().await;
        let mut view = ExpensesView::new();
        view.activate(&store).await;

        fill(&mut view, "Coffee", "3.20", "2024-02-03");
        view.form.category = "Food".to_string();
        view.add(&store).await;

        assert_eq!(view.take_alert(), None);
        assert_eq!(view.expenses.len(), 1);
        assert_eq!(view.expenses[0].category.as_deref(), Some("Food"));
        assert_eq!(view.form, ExpenseForm::new(today()));
        assert!(!view.loading);
    }

    #[tokio::test]
    async fn test_invalid_add_makes_no_call() {
        let (backend, store, _ana) = signed_in().await;
        let mut view = ExpensesView::new();
        backend.clear_calls();

        fill(&mut view, "Coffee", "three", "2024-02-03");
        view.add(&store).await;

        assert!(view.form_errors().has("amount"));
        assert!(backend.calls().is_empty());
        assert_eq!(view.form.title, "Coffee");
    }

    #[tokio::test]
    async fn test_add_failure_alerts() {
        let (backend, store, _ana) = signed_in().await;
        let mut view = ExpensesView::new();
        backend.fail_next_row_call("insert rejected");

        fill(&mut view, "Coffee", "3", "2024-02-03");
        view.add(&store).await;

        assert_eq!(view.take_alert().as_deref(), Some("insert rejected"));
        assert_eq!(view.take_alert(), None);
        assert!(!view.loading);
        assert_eq!(view.form.title, "Coffee");
    }

    #[tokio::test]
    async fn test_load_failure_alerts_fixed_message() {
        let (backend, store, _ana) = signed_in().await;
        let mut view = ExpensesView::new();
        backend.fail_next_row_call("boom");

        view.load(&store).await;

        assert_eq!(view.take_alert().as_deref(), Some(LOAD_FAILED));
        assert!(!view.loading);
    }

    #[tokio::test]
    async fn test_remove_requires_confirmation() {
        let (backend, store, _ana) = signed_in().await;
        let mut view = ExpensesView::new();
        fill(&mut view, "Coffee", "3", "2024-02-03");
        view.add(&store).await;
        let id = view.expenses[0].id.clone();
        backend.clear_calls();

        let mut prompt = None;
        view.remove(&store, &id, |p| {
            prompt = Some(p.to_string());
            false
        })
        .await;
        assert_eq!(prompt.as_deref(), Some(CONFIRM_DELETE));
        assert!(backend.calls().is_empty());
        assert_eq!(view.expenses.len(), 1);

        view.remove(&store, &id, |_| true).await;
        assert!(view.expenses.is_empty());
    }

    #[tokio::test]
    async fn test_logout_and_identity_changes() {
        let (_backend, store, ana) = signed_in().await;
        let mut view = ExpensesView::new();
        view.activate(&store).await;

        view.on_identity_change(None);
        assert_eq!(view.user, None);
        view.on_identity_change(Some(ana));

        assert_eq!(view.logout(&store).await, Route::Login);
        assert_eq!(view.user, None);
        assert_eq!(store.current_identity(), None);
    }
}
