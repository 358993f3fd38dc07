//! View models
//!
//! Front-end independent state for each routed view. Every view offers a
//! split `begin_*` / `finish_*` API, for hosts that cannot hold `&mut` across
//! an await (the web UI), and async convenience methods for the CLI.

pub mod dashboard;
pub mod expenses;
pub mod login;

pub use dashboard::DashboardView;
pub use expenses::{ExpensesView, CONFIRM_DELETE};
pub use login::LoginView;

use crate::models::Identity;
use crate::session::SessionStore;

/// Wait for startup restoration, then read the cached identity
pub async fn resolve_identity(store: &SessionStore) -> Option<Identity> {
    store.wait_until_ready().await;
    store.current_identity()
}
