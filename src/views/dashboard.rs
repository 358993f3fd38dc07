//! Dashboard view model

use chrono::NaiveDate;

use super::resolve_identity;
use crate::error::Result;
use crate::forms::today;
use crate::models::{Expense, Identity};
use crate::routes::Route;
use crate::session::SessionStore;
use crate::summary::ExpenseSummary;

const LOAD_FAILED: &str = "Failed to load expenses";

#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    pub user: Option<Identity>,
    pub summary: ExpenseSummary,
    pub loading: bool,
    alert: Option<String>,
}

impl DashboardView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    pub fn begin_activate(&mut self, identity: Option<Identity>) -> Option<Route> {
        self.user = identity;
        self.user.is_none().then_some(Route::Login)
    }

    pub async fn activate(&mut self, store: &SessionStore) -> Option<Route> {
        let identity = resolve_identity(store).await;
        if let Some(route) = self.begin_activate(identity) {
            return Some(route);
        }
        self.load(store).await;
        None
    }

    pub fn on_identity_change(&mut self, identity: Option<Identity>) {
        self.user = identity;
    }

    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    pub fn finish_load(&mut self, result: Result<Vec<Expense>>, today: NaiveDate) {
        self.loading = false;
        match result {
            Ok(expenses) => self.summary = ExpenseSummary::compute(&expenses, today),
            Err(e) => {
                tracing::error!(error = %e, "Loading dashboard failed");
                self.alert = Some(LOAD_FAILED.to_string());
            }
        }
    }

    pub async fn load(&mut self, store: &SessionStore) {
        self.begin_load();
        let result = store.list_expenses().await;
        self.finish_load(result, today());
    }
}
