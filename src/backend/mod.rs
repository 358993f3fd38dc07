//! Backend Integration
//!
//! The contract consumed from the hosted identity + row service, and its
//! implementations.
//!
//! ## Architecture
//!
//! - **Backend**: the trait the session store talks to
//! - **SupabaseClient**: HTTPS client for Supabase auth (GoTrue) and rows (PostgREST)
//! - **MemoryBackend**: in-process stand-in that enforces row ownership, for tests
//!   (`testing` feature)
//!
//! Session changes are published on a broadcast channel; the session store
//! subscribes once restoration has finished.

mod error;
#[cfg(any(test, feature = "testing"))]
mod memory;
mod supabase;

pub use error::BackendError;
#[cfg(any(test, feature = "testing"))]
pub use memory::{BackendCall, MemoryBackend};
pub use supabase::SupabaseClient;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::models::{AuthEvent, Expense, NewExpense, Session, SignInReply};

/// Table holding expense rows
pub const EXPENSES_TABLE: &str = "expenses";

/// Capacity of the auth event channel
pub const AUTH_EVENT_CAPACITY: usize = 64;

/// Operations the client needs from the hosted backend.
///
/// Row operations run with the caller's session; the backend's row-level
/// policy restricts them to rows owned by that session's user.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Backend: Send + Sync {
    /// Session restored from the backend client's own persisted storage
    async fn get_session(&self) -> Result<Option<Session>, BackendError>;

    /// Exchange an access/refresh token pair for a fresh session
    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Session, BackendError>;

    /// Subscribe to session changes
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignInReply, BackendError>;

    /// Request a magic link email. Success means the request was accepted.
    async fn sign_in_with_otp(&self, email: &str) -> Result<(), BackendError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignInReply, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Rows whose `user_id` equals `owner`, newest date first
    async fn select_expenses(&self, owner: &str) -> Result<Vec<Expense>, BackendError>;

    /// Insert a row; the backend assigns the owner. Returns the created rows.
    async fn insert_expense(&self, expense: &NewExpense) -> Result<Vec<Expense>, BackendError>;

    /// Delete rows matching both `id` and `owner`
    async fn delete_expense(&self, id: &str, owner: &str) -> Result<(), BackendError>;
}
