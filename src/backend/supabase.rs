//! Supabase REST Client
//!
//! HTTP client for the Supabase auth (GoTrue) and row (PostgREST) APIs.
//! Keeps the current session in memory and, when configured, in local
//! storage under `sb-<project-ref>-auth-token`.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use super::{Backend, BackendError, AUTH_EVENT_CAPACITY, EXPENSES_TABLE};
use crate::config::BackendConfig;
use crate::models::{
    AuthChangeEvent, AuthEvent, Expense, Identity, NewExpense, Session, SignInReply,
};
use crate::storage::KeyValueStore;

/// Refresh the access token when it expires within this many seconds
const EXPIRY_MARGIN_SECS: i64 = 10;

/// Supabase auth + REST client
pub struct SupabaseClient {
    client: Client,
    config: BackendConfig,
    storage: Arc<dyn KeyValueStore>,
    storage_key: String,
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct OtpRequest<'a> {
    email: &'a str,
    create_user: bool,
}

impl SupabaseClient {
    /// Create a client for the configured project
    pub fn new(
        config: BackendConfig,
        storage: Arc<dyn KeyValueStore>,
    ) -> Result<Self, BackendError> {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(std::time::Duration::from_secs(config.request_timeout_secs));
        let client = builder.build()?;

        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        let storage_key = config.session_storage_key();

        Ok(Self {
            client,
            config,
            storage,
            storage_key,
            session: Mutex::new(None),
            events,
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Local storage key holding the persisted session
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.base_url(), path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url(), table)
    }

    fn current(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Session persisted by a previous run, if any.
    /// Unreadable entries are removed so they are not retried.
    fn load_persisted(&self) -> Option<Session> {
        if !self.config.persist_session {
            return None;
        }

        let raw = match self.storage.get_item(&self.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted session");
                return None;
            }
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable persisted session");
                let _ = self.storage.remove_item(&self.storage_key);
                None
            }
        }
    }

    /// Adopt a session, persist it and announce the change
    fn save_session(&self, session: Session, kind: AuthChangeEvent) {
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());

        if self.config.persist_session {
            match serde_json::to_string(&session) {
                Ok(json) => {
                    if let Err(e) = self.storage.set_item(&self.storage_key, &json) {
                        tracing::warn!(error = %e, "Failed to persist session");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to serialize session"),
            }
        }

        // No receivers is fine
        let _ = self.events.send(AuthEvent::new(kind, Some(session)));
    }

    fn clear_session(&self) {
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = None;
        if let Err(e) = self.storage.remove_item(&self.storage_key) {
            tracing::warn!(error = %e, "Failed to remove persisted session");
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, BackendError> {
        tracing::debug!("Refreshing session");
        let request = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.config.anon_key)
            .json(&RefreshRequest { refresh_token });

        let session: Session = send_json(request).await?;
        Ok(session.with_expiry_from(Utc::now()))
    }

    /// Access token for row calls, refreshed if about to expire
    async fn access_token(&self) -> Result<String, BackendError> {
        self.get_session()
            .await?
            .map(|s| s.access_token)
            .ok_or(BackendError::SessionMissing)
    }

    fn rest_request(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl Backend for SupabaseClient {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        let Some(session) = self.current().or_else(|| self.load_persisted()) else {
            return Ok(None);
        };

        if !self.config.auto_refresh_token
            || !session.expires_within(Utc::now(), EXPIRY_MARGIN_SECS)
        {
            *self.session.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
            return Ok(Some(session));
        }

        match self.refresh(&session.refresh_token).await {
            Ok(fresh) => {
                self.save_session(fresh.clone(), AuthChangeEvent::TokenRefreshed);
                Ok(Some(fresh))
            }
            Err(e) if e.is_rejection() => {
                tracing::warn!(error = %e, "Refresh token rejected, signing out");
                self.clear_session();
                let _ = self
                    .events
                    .send(AuthEvent::new(AuthChangeEvent::SignedOut, None));
                Err(e)
            }
            Err(e) => {
                // Keep the session so the next call retries the refresh
                tracing::warn!(error = %e, "Session refresh failed");
                *self.session.lock().unwrap_or_else(|e| e.into_inner()) = Some(session);
                Err(e)
            }
        }
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Session, BackendError> {
        if access_token.is_empty() || refresh_token.is_empty() {
            return Err(BackendError::SessionMissing);
        }

        let session = self.refresh(refresh_token).await?;
        self.save_session(session.clone(), AuthChangeEvent::SignedIn);
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
        tracing::debug!(email = %email, "Password sign-in");
        let request = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.config.anon_key)
            .json(&PasswordCredentials { email, password });

        let session: Session = send_json(request).await?;
        let session = session.with_expiry_from(Utc::now());
        self.save_session(session.clone(), AuthChangeEvent::SignedIn);

        Ok(SignInReply {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    async fn sign_in_with_otp(&self, email: &str) -> Result<(), BackendError> {
        tracing::debug!(email = %email, "Requesting magic link");
        let request = self
            .client
            .post(self.auth_url("otp"))
            .header("apikey", &self.config.anon_key)
            .json(&OtpRequest {
                email,
                create_user: true,
            });

        send_empty(request).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignInReply, BackendError> {
        tracing::debug!(email = %email, "Password sign-up");
        let request = self
            .client
            .post(self.auth_url("signup"))
            .header("apikey", &self.config.anon_key)
            .json(&PasswordCredentials { email, password });

        // With email confirmation enabled the body is a bare user, otherwise a session
        let body: serde_json::Value = send_json(request).await?;
        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value(body)
                .map_err(|e| BackendError::Decode(e.to_string()))?;
            let session = session.with_expiry_from(Utc::now());
            self.save_session(session.clone(), AuthChangeEvent::SignedIn);
            return Ok(SignInReply {
                user: Some(session.user.clone()),
                session: Some(session),
            });
        }

        let user: Identity =
            serde_json::from_value(body).map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(SignInReply {
            session: None,
            user: Some(user),
        })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let remote = match self.current().or_else(|| self.load_persisted()) {
            Some(session) => {
                let request = self
                    .client
                    .post(self.auth_url("logout"))
                    .header("apikey", &self.config.anon_key)
                    .bearer_auth(&session.access_token);
                send_empty(request).await
            }
            None => Ok(()),
        };

        // Local state goes regardless of the remote outcome
        self.clear_session();
        let _ = self
            .events
            .send(AuthEvent::new(AuthChangeEvent::SignedOut, None));

        remote
    }

    async fn select_expenses(&self, owner: &str) -> Result<Vec<Expense>, BackendError> {
        let token = self.access_token().await?;
        tracing::debug!(owner = %owner, "Selecting expenses");

        let request = self.rest_request(self.client.get(self.rest_url(EXPENSES_TABLE)), &token);
        let request = request.query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", owner)),
            ("order", "date.desc".to_string()),
        ]);

        send_json(request).await
    }

    async fn insert_expense(&self, expense: &NewExpense) -> Result<Vec<Expense>, BackendError> {
        let token = self.access_token().await?;
        tracing::debug!(title = %expense.title, "Inserting expense");

        let request = self
            .rest_request(self.client.post(self.rest_url(EXPENSES_TABLE)), &token)
            .header("Prefer", "return=representation")
            .json(&[expense]);

        send_json(request).await
    }

    async fn delete_expense(&self, id: &str, owner: &str) -> Result<(), BackendError> {
        let token = self.access_token().await?;
        tracing::debug!(id = %id, owner = %owner, "Deleting expense");

        let request = self
            .rest_request(self.client.delete(self.rest_url(EXPENSES_TABLE)), &token)
            .query(&[("id", format!("eq.{}", id)), ("user_id", format!("eq.{}", owner))]);

        send_empty(request).await
    }
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, BackendError> {
    let response = request.send().await.map_err(BackendError::from_transport)?;
    let status = response.status();

    if status.is_success() {
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(BackendError::from_body(status.as_u16(), &text))
    }
}

async fn send_empty(request: RequestBuilder) -> Result<(), BackendError> {
    let response = request.send().await.map_err(BackendError::from_transport)?;
    let status = response.status();

    if status.is_success() {
        Ok(())
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(BackendError::from_body(status.as_u16(), &text))
    }
}
