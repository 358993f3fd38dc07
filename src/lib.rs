//! # Spendbook
//!
//! Personal expense tracker client for a hosted Supabase project: password,
//! magic-link and sign-up auth, session restoration, and expense records
//! scoped to the signed-in account.
//!
//! ## Features
//!
//! - **Session store**: one observable identity, restored at startup from the
//!   backend's own storage or a legacy token entry
//! - **Owner-scoped rows**: list, add and delete only ever touch the signed-in
//!   identity's expenses
//! - **Front-end independent views**: login, expense list and dashboard view
//!   models shared by the CLI and the Leptos web UI
//!
//! ## Modules
//!
//! - [`session`]: session store and legacy token restoration
//! - [`backend`]: the hosted-service contract, its HTTPS client and an in-memory fake
//! - [`storage`]: synchronous key/value storage (memory, JSON file)
//! - [`forms`], [`views`]: form validation and view models
//! - [`nav`], [`layout`], [`routes`]: sidebar tree, root layout and route table
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spendbook::backend::SupabaseClient;
//! use spendbook::storage::MemoryStorage;
//! use spendbook::{BackendConfig, SessionStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = Arc::new(MemoryStorage::new());
//!     let config = BackendConfig::new("https://abcd.supabase.co", "anon-key");
//!     let backend = Arc::new(SupabaseClient::new(config, storage.clone())?);
//!
//!     let store = SessionStore::new(backend, storage);
//!     let mut events = store.initialize().await;
//!
//!     store.sign_in_with_password("ana@example.com", "secret").await?;
//!     store.apply_pending(&mut events);
//!
//!     for expense in store.list_expenses().await? {
//!         println!("{} {} {:.2}", expense.date, expense.title, expense.amount);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod forms;
pub mod layout;
pub mod models;
pub mod nav;
pub mod routes;
pub mod session;
pub mod storage;
pub mod summary;
pub mod views;

// Re-export top-level types for convenience
pub use backend::{Backend, BackendError, SupabaseClient};

#[cfg(any(test, feature = "testing"))]
pub use backend::MemoryBackend;

pub use config::{BackendConfig, Config, ConfigError, LoggingConfig, StorageConfig};

pub use error::{Error, Result};

pub use forms::{ExpenseForm, FormError, FormErrors, LoginAction, LoginForm};

pub use models::{
    AppUser, AuthChangeEvent, AuthEvent, Expense, Identity, NewExpense, Session, SignInReply,
};

pub use nav::{NavItem, Sidebar, NAV_ITEMS};

pub use layout::{RootLayout, MOBILE_BREAKPOINT};

pub use routes::{Resolved, Route};

pub use session::SessionStore;

pub use storage::{FileStorage, KeyValueStore, MemoryStorage, StorageError};

pub use summary::ExpenseSummary;

pub use views::{DashboardView, ExpensesView, LoginView};
