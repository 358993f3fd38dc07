//! Form models and validation
//!
//! Forms hold raw text exactly as typed. Validation runs before any network
//! call and either produces the typed payload or a [`FormErrors`] list.

use chrono::{Local, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::models::NewExpense;

const EMAIL_MAX_LEN: usize = 254;
const EMAIL_LOCAL_MAX_LEN: usize = 64;

/// Date format accepted by the expense form
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Syntactic email check (length limits plus the usual address grammar)
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL_RE.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-zA-Z0-9!#$%&'*+/=?^_`{|}~-]+)*@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .expect("email pattern is valid")
    });

    if email.is_empty() || email.len() > EMAIL_MAX_LEN {
        return false;
    }
    match email.split_once('@') {
        Some((local, _)) if !local.is_empty() && local.len() <= EMAIL_LOCAL_MAX_LEN => {
            re.is_match(email)
        }
        _ => false,
    }
}

// ---------------------------------------------------------------
// Errors
// ---------------------------------------------------------------

/// A single field-level validation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be a valid email address")]
    InvalidEmail { field: &'static str },

    #[error("{field} must be a number")]
    NotANumber { field: &'static str },

    #[error("{field} must be a date (YYYY-MM-DD)")]
    InvalidDate { field: &'static str },
}

impl FormError {
    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            FormError::Required { field }
            | FormError::InvalidEmail { field }
            | FormError::NotANumber { field }
            | FormError::InvalidDate { field } => field,
        }
    }
}

/// Every validation failure of one submission
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("{}", join_errors(.0))]
pub struct FormErrors(Vec<FormError>);

fn join_errors(errors: &[FormError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FormError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if any failure concerns `field`
    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field() == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormError> {
        self.0.iter()
    }

    /// `Ok(value)` when no failure was recorded
    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

// ---------------------------------------------------------------
// Login
// ---------------------------------------------------------------

/// Submit actions of the login form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginAction {
    MagicLink,
    SignIn,
    SignUp,
}

impl LoginAction {
    /// Magic links only need an email
    pub fn needs_password(self) -> bool {
        !matches!(self, LoginAction::MagicLink)
    }

    /// Message shown when the backend error carries none
    pub fn fallback_error(self) -> &'static str {
        match self {
            LoginAction::MagicLink => "Failed to send magic link",
            LoginAction::SignIn => "Login failed.",
            LoginAction::SignUp => "Sign up failed",
        }
    }
}

/// Login form fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Validate only the fields `action` needs
    pub fn validate(&self, action: LoginAction) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();

        if self.email.is_empty() {
            errors.push(FormError::Required { field: "email" });
        } else if !is_valid_email(&self.email) {
            errors.push(FormError::InvalidEmail { field: "email" });
        }

        if action.needs_password() && self.password.is_empty() {
            errors.push(FormError::Required { field: "password" });
        }

        errors.into_result(|| ())
    }
}

// ---------------------------------------------------------------
// Expense
// ---------------------------------------------------------------

/// Add-expense form fields, as typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseForm {
    pub title: String,
    pub amount: String,
    pub category: String,
    pub date: String,
}

impl Default for ExpenseForm {
    fn default() -> Self {
        Self::new(today())
    }
}

impl ExpenseForm {
    /// Empty form dated `date`
    pub fn new(date: NaiveDate) -> Self {
        Self {
            title: String::new(),
            amount: String::new(),
            category: String::new(),
            date: date.format(DATE_FORMAT).to_string(),
        }
    }

    /// Clear every field and set the date back to `date`
    pub fn reset(&mut self, date: NaiveDate) {
        *self = Self::new(date);
    }

    /// Build the insert payload, or report every invalid field
    pub fn validate(&self) -> Result<NewExpense, FormErrors> {
        let mut errors = FormErrors::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.push(FormError::Required { field: "title" });
        }

        let amount = self.amount.trim();
        let parsed_amount = if amount.is_empty() {
            errors.push(FormError::Required { field: "amount" });
            None
        } else {
            match amount.parse::<f64>() {
                Ok(value) if value.is_finite() => Some(value),
                _ => {
                    errors.push(FormError::NotANumber { field: "amount" });
                    None
                }
            }
        };

        let date = self.date.trim();
        let parsed_date = if date.is_empty() {
            errors.push(FormError::Required { field: "date" });
            None
        } else {
            match NaiveDate::parse_from_str(date, DATE_FORMAT) {
                Ok(d) => Some(d),
                Err(_) => {
                    errors.push(FormError::InvalidDate { field: "date" });
                    None
                }
            }
        };

        let category = Some(self.category.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        match (parsed_amount, parsed_date) {
            (Some(amount), Some(date)) if errors.is_empty() => Ok(NewExpense {
                title: title.to_string(),
                amount,
                category,
                date,
            }),
            _ => Err(errors),
        }
    }
}

/// Today's date on the local clock
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
