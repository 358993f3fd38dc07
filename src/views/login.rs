//! Login view model

use crate::error::Result;
use crate::forms::{FormErrors, LoginAction, LoginForm};
use crate::models::SignInReply;
use crate::routes::Route;
use crate::session::SessionStore;

pub const MAGIC_LINK_SENT: &str = "Magic link sent — open it in the same browser.";
pub const LOGIN_SUCCESSFUL: &str = "Login successful!";
pub const NO_SESSION_RETURNED: &str = "No session returned — check your credentials.";
pub const SIGN_UP_OK: &str = "Sign-up OK. Check email if confirmation required.";

#[derive(Debug, Clone, Default)]
pub struct LoginView {
    pub form: LoginForm,
    pub loading: bool,
    pub message: String,
    errors: FormErrors,
}

impl LoginView {
    pub fn new() -> Self {
        Self::default()
    }

    /// True after a submission was rejected by validation
    pub fn is_invalid(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    /// Validate for `action` and enter the loading state.
    /// Returns false when the backend must not be called.
    pub fn begin(&mut self, action: LoginAction) -> bool {
        match self.form.validate(action) {
            Ok(()) => {
                self.errors = FormErrors::default();
                self.loading = true;
                self.message.clear();
                true
            }
            Err(errors) => {
                tracing::debug!(?action, %errors, "Login form invalid");
                self.errors = errors;
                false
            }
        }
    }

    pub fn finish_magic_link(&mut self, result: Result<()>) {
        self.loading = false;
        self.message = match result {
            Ok(()) => MAGIC_LINK_SENT.to_string(),
            Err(e) => e.message_or(LoginAction::MagicLink.fallback_error()),
        };
    }

    /// Returns where to navigate, if anywhere
    pub fn finish_sign_in(&mut self, result: Result<SignInReply>) -> Option<Route> {
        self.loading = false;
        match result {
            Ok(reply) if reply.session.is_some() => {
                self.message = LOGIN_SUCCESSFUL.to_string();
                Some(Route::Expenses)
            }
            Ok(_) => {
                self.message = NO_SESSION_RETURNED.to_string();
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "Password sign-in failed");
                self.message = e.message_or(LoginAction::SignIn.fallback_error());
                None
            }
        }
    }

    pub fn finish_sign_up(&mut self, result: Result<SignInReply>) {
        self.loading = false;
        self.message = match result {
            Ok(_) => SIGN_UP_OK.to_string(),
            Err(e) => e.message_or(LoginAction::SignUp.fallback_error()),
        };
    }

    /// Run one submit action end to end
    pub async fn submit(&mut self, store: &SessionStore, action: LoginAction) -> Option<Route> {
        if !self.begin(action) {
            return None;
        }

        let email = self.form.email.clone();
        let password = self.form.password.clone();
        match action {
            LoginAction::MagicLink => {
                let result = store.sign_in_with_magic_link(&email).await;
                self.finish_magic_link(result);
                None
            }
            LoginAction::SignIn => {
                let result = store.sign_in_with_password(&email, &password).await;
                self.finish_sign_in(result)
            }
            LoginAction::SignUp => {
                let result = store.sign_up_with_password(&email, &password).await;
                self.finish_sign_up(result);
                None
            }
        }
    }
}
