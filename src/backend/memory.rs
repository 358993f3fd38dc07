//! In-memory backend
//!
//! Stands in for the hosted service in tests: keeps accounts, one active
//! session and expense rows in process, enforces the row-level ownership
//! policy, and records every call so tests can assert what reached the
//! "network".

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{Backend, BackendError, AUTH_EVENT_CAPACITY};
use crate::models::{
    AuthChangeEvent, AuthEvent, Expense, Identity, NewExpense, Session, SignInReply,
};

/// A call that reached the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    GetSession,
    SetSession,
    SignInWithPassword { email: String },
    SignInWithOtp { email: String },
    SignUp { email: String },
    SignOut,
    SelectExpenses { owner: String },
    InsertExpense { title: String },
    DeleteExpense { id: String, owner: String },
}

impl BackendCall {
    /// True for row operations (select/insert/delete)
    pub fn is_row_call(&self) -> bool {
        matches!(
            self,
            BackendCall::SelectExpenses { .. }
                | BackendCall::InsertExpense { .. }
                | BackendCall::DeleteExpense { .. }
        )
    }
}

struct Account {
    identity: Identity,
    password: String,
    confirmed: bool,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    session: Option<Session>,
    refresh_tokens: HashMap<String, String>,
    rows: Vec<Expense>,
    calls: Vec<BackendCall>,
    require_confirmation: bool,
    fail_get_session: bool,
    fail_next_row_call: Option<String>,
}

impl State {
    fn account_by_id(&self, id: &str) -> Option<&Account> {
        self.accounts.values().find(|a| a.identity.id == id)
    }

    fn open_session(&mut self, identity: Identity) -> Session {
        let refresh_token = Uuid::new_v4().simple().to_string();
        self.refresh_tokens
            .insert(refresh_token.clone(), identity.id.clone());

        let session = Session {
            access_token: Uuid::new_v4().simple().to_string(),
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: Some(3600),
            expires_at: None,
            user: identity,
        }
        .with_expiry_from(Utc::now());

        self.session = Some(session.clone());
        session
    }

    fn caller(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user.id.as_str())
    }

    fn take_row_failure(&mut self) -> Result<(), BackendError> {
        match self.fail_next_row_call.take() {
            Some(message) => Err(BackendError::Api {
                status: 500,
                message,
            }),
            None => Ok(()),
        }
    }
}

/// In-process backend with row-level ownership
pub struct MemoryBackend {
    state: Mutex<State>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            state: Mutex::new(State::default()),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, kind: AuthChangeEvent, session: Option<Session>) {
        let _ = self.events.send(AuthEvent::new(kind, session));
    }

    /// Register a confirmed account
    pub fn add_account(&self, email: &str, password: &str) -> Identity {
        let identity = Identity::new(Uuid::new_v4().to_string(), email);
        self.lock().accounts.insert(
            email.to_string(),
            Account {
                identity: identity.clone(),
                password: password.to_string(),
                confirmed: true,
            },
        );
        identity
    }

    /// Make new sign-ups wait for email confirmation
    pub fn set_require_confirmation(&self, require: bool) {
        self.lock().require_confirmation = require;
    }

    /// Open a session as if persisted by an earlier run; no event is emitted
    pub fn persist_session_for(&self, email: &str) -> Option<Session> {
        let mut state = self.lock();
        let identity = state.accounts.get(email)?.identity.clone();
        Some(state.open_session(identity))
    }

    /// Issue a token pair for `email` without opening a session,
    /// as a previous client version would have stored it
    pub fn issue_tokens(&self, email: &str) -> Option<(String, String)> {
        let mut state = self.lock();
        let user_id = state.accounts.get(email)?.identity.id.clone();
        let access = Uuid::new_v4().simple().to_string();
        let refresh = Uuid::new_v4().simple().to_string();
        state.refresh_tokens.insert(refresh.clone(), user_id);
        Some((access, refresh))
    }

    /// Make `get_session` fail until reset
    pub fn set_fail_get_session(&self, fail: bool) {
        self.lock().fail_get_session = fail;
    }

    /// Make the next row operation fail with `message`
    pub fn fail_next_row_call(&self, message: &str) {
        self.lock().fail_next_row_call = Some(message.to_string());
    }

    /// Store a row owned by `owner` directly
    pub fn seed_expense(&self, owner: &str, expense: NewExpense) -> Expense {
        let row = Expense {
            id: Uuid::new_v4().to_string(),
            title: expense.title,
            amount: expense.amount,
            category: expense.category,
            date: expense.date,
            user_id: owner.to_string(),
            created_at: Some(Utc::now()),
        };
        self.lock().rows.push(row.clone());
        row
    }

    /// End the active session from "elsewhere" (expiry, another device)
    pub fn revoke_session(&self) {
        self.lock().session = None;
        self.emit(AuthChangeEvent::SignedOut, None);
    }

    /// Every row regardless of owner
    pub fn rows(&self) -> Vec<Expense> {
        self.lock().rows.clone()
    }

    /// Calls received so far, oldest first
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl Backend for MemoryBackend {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::GetSession);
        if state.fail_get_session {
            return Err(BackendError::Unavailable);
        }
        Ok(state.session.clone())
    }

    async fn set_session(
        &self,
        _access_token: &str,
        refresh_token: &str,
    ) -> Result<Session, BackendError> {
        let session = {
            let mut state = self.lock();
            state.calls.push(BackendCall::SetSession);

            // Refresh tokens are single use
            let user_id = state.refresh_tokens.remove(refresh_token).ok_or_else(|| {
                BackendError::Api {
                    status: 400,
                    message: "Invalid Refresh Token: Refresh Token Not Found".to_string(),
                }
            })?;
            let identity = state
                .account_by_id(&user_id)
                .map(|a| a.identity.clone())
                .ok_or(BackendError::SessionMissing)?;
            state.open_session(identity)
        };

        self.emit(AuthChangeEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignInReply, BackendError> {
        let session = {
            let mut state = self.lock();
            state.calls.push(BackendCall::SignInWithPassword {
                email: email.to_string(),
            });

            let invalid = || BackendError::Api {
                status: 400,
                message: "Invalid login credentials".to_string(),
            };
            let account = state.accounts.get(email).ok_or_else(invalid)?;
            if account.password != password {
                return Err(invalid());
            }
            if !account.confirmed {
                return Err(BackendError::Api {
                    status: 400,
                    message: "Email not confirmed".to_string(),
                });
            }
            let identity = account.identity.clone();
            state.open_session(identity)
        };

        self.emit(AuthChangeEvent::SignedIn, Some(session.clone()));
        Ok(SignInReply {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    async fn sign_in_with_otp(&self, email: &str) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::SignInWithOtp {
            email: email.to_string(),
        });
        if !email.contains('@') {
            return Err(BackendError::Api {
                status: 400,
                message: "Unable to validate email address: invalid format".to_string(),
            });
        }
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignInReply, BackendError> {
        let reply = {
            let mut state = self.lock();
            state.calls.push(BackendCall::SignUp {
                email: email.to_string(),
            });

            if state.accounts.contains_key(email) {
                return Err(BackendError::Api {
                    status: 422,
                    message: "User already registered".to_string(),
                });
            }

            let identity = Identity::new(Uuid::new_v4().to_string(), email);
            let confirmed = !state.require_confirmation;
            state.accounts.insert(
                email.to_string(),
                Account {
                    identity: identity.clone(),
                    password: password.to_string(),
                    confirmed,
                },
            );

            if confirmed {
                let session = state.open_session(identity.clone());
                SignInReply {
                    session: Some(session),
                    user: Some(identity),
                }
            } else {
                SignInReply {
                    session: None,
                    user: Some(identity),
                }
            }
        };

        if let Some(session) = &reply.session {
            self.emit(AuthChangeEvent::SignedIn, Some(session.clone()));
        }
        Ok(reply)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        {
            let mut state = self.lock();
            state.calls.push(BackendCall::SignOut);
            state.session = None;
        }
        self.emit(AuthChangeEvent::SignedOut, None);
        Ok(())
    }

    async fn select_expenses(&self, owner: &str) -> Result<Vec<Expense>, BackendError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::SelectExpenses {
            owner: owner.to_string(),
        });
        state.take_row_failure()?;

        // Anonymous callers see no rows
        let Some(caller) = state.caller() else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<Expense> = state
            .rows
            .iter()
            .filter(|r| r.user_id == owner && r.user_id == caller)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(rows)
    }

    async fn insert_expense(&self, expense: &NewExpense) -> Result<Vec<Expense>, BackendError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::InsertExpense {
            title: expense.title.clone(),
        });
        state.take_row_failure()?;

        let owner = state
            .caller()
            .ok_or_else(|| BackendError::Api {
                status: 401,
                message: "new row violates row-level security policy for table \"expenses\""
                    .to_string(),
            })?
            .to_string();

        let row = Expense {
            id: Uuid::new_v4().to_string(),
            title: expense.title.clone(),
            amount: expense.amount,
            category: expense.category.clone(),
            date: expense.date,
            user_id: owner,
            created_at: Some(Utc::now()),
        };
        state.rows.push(row.clone());
        Ok(vec![row])
    }

    async fn delete_expense(&self, id: &str, owner: &str) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::DeleteExpense {
            id: id.to_string(),
            owner: owner.to_string(),
        });
        state.take_row_failure()?;

        let Some(caller) = state.caller().map(str::to_string) else {
            return Ok(());
        };
        state
            .rows
            .retain(|r| !(r.id == id && r.user_id == owner && r.user_id == caller));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_expense(title: &str, day: u32) -> NewExpense {
        NewExpense {
            title: title.to_string(),
            amount: 10.0,
            category: None,
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_rows_are_owner_scoped() {
        let backend = MemoryBackend::new();
        let ana = backend.add_account("ana@example.com", "pw");
        let bob = backend.add_account("bob@example.com", "pw");
        backend.seed_expense(&ana.id, new_expense("Ana's", 1));
        backend.seed_expense(&bob.id, new_expense("Bob's", 2));

        backend
            .sign_in_with_password("ana@example.com", "pw")
            .await
            .unwrap();

        let mine = backend.select_expenses(&ana.id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title, "Ana's");

        // Filtering by someone else's id returns nothing under the policy
        assert!(backend.select_expenses(&bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_assigns_owner_from_session() {
        let backend = MemoryBackend::new();
        let ana = backend.add_account("ana@example.com", "pw");

        let err = backend.insert_expense(&new_expense("x", 1)).await.unwrap_err();
        assert!(matches!(err, BackendError::Api { status: 401, .. }));

        backend
            .sign_in_with_password("ana@example.com", "pw")
            .await
            .unwrap();
        let created = backend.insert_expense(&new_expense("x", 1)).await.unwrap();
        assert_eq!(created[0].user_id, ana.id);
    }

    #[tokio::test]
    async fn test_refresh_tokens_are_single_use() {
        let backend = MemoryBackend::new();
        backend.add_account("ana@example.com", "pw");
        let (access, refresh) = backend.issue_tokens("ana@example.com").unwrap();

        assert!(backend.set_session(&access, &refresh).await.is_ok());
        assert!(backend.set_session(&access, &refresh).await.is_err());
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let backend = MemoryBackend::new();
        backend.add_account("ana@example.com", "pw");

        let err = backend
            .sign_in_with_password("ana@example.com", "nope")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn test_sign_up_with_confirmation() {
        let backend = MemoryBackend::new();
        backend.set_require_confirmation(true);

        let reply = backend.sign_up("new@example.com", "pw").await.unwrap();
        assert!(reply.session.is_none());
        assert_eq!(reply.user.unwrap().email, "new@example.com");

        let err = backend
            .sign_in_with_password("new@example.com", "pw")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Email not confirmed");
    }
}
