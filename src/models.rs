//! Domain Types
//!
//! Identities, sessions and expense records as exchanged with the backend.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The authenticated user, as cached by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }
}

/// A time-bounded credential issued by the backend after sign-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds at issue time
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix timestamp (seconds) after which the access token is rejected
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: Identity,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Fill in `expires_at` from `expires_in` when the backend only sent the latter.
    pub fn with_expiry_from(mut self, now: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self.expires_in.map(|secs| now.timestamp() + secs);
        }
        self
    }

    /// True if the access token expires within `margin_secs` of `now`.
    /// Sessions without an expiry never expire client-side.
    pub fn expires_within(&self, now: DateTime<Utc>, margin_secs: i64) -> bool {
        match self.expires_at {
            Some(at) => at <= now.timestamp() + margin_secs,
            None => false,
        }
    }
}

/// Kind of session change reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChangeEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Session change notification
#[derive(Debug, Clone, PartialEq)]
pub struct AuthEvent {
    pub kind: AuthChangeEvent,
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn new(kind: AuthChangeEvent, session: Option<Session>) -> Self {
        Self { kind, session }
    }

    /// The identity carried by the event, if any
    pub fn identity(&self) -> Option<&Identity> {
        self.session.as_ref().map(|s| &s.user)
    }
}

/// Reply to a password sign-in or sign-up.
///
/// `session` is `None` when the backend accepted the request but did not
/// open a session (e.g. sign-up awaiting email confirmation).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignInReply {
    pub session: Option<Session>,
    pub user: Option<Identity>,
}

/// The `{id, email}` record mirrored into local storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUser {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
}

impl From<&Identity> for AppUser {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
        }
    }
}

/// A stored expense row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    pub amount: f64,
    #[serde(default)]
    pub category: Option<String>,
    pub date: NaiveDate,
    pub user_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Expense {
    /// Category label, treating a blank category as absent
    pub fn category_label(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Insert payload for a new expense. Carries no owner; the backend assigns
/// `user_id` from the authenticated caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub title: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub date: NaiveDate,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_expense_accepts_numeric_and_text_ids() {
        let numeric: Expense = serde_json::from_str(
            r#"{"id": 42, "title": "Coffee", "amount": 3.5, "category": null,
                "date": "2024-03-01", "user_id": "u1"}"#,
        )
        .unwrap();
        assert_eq!(numeric.id, "42");
        assert_eq!(numeric.category, None);

        let text: Expense = serde_json::from_str(
            r#"{"id": "9b2e", "title": "Rent", "amount": 900, "category": "Home",
                "date": "2024-03-01", "user_id": "u1",
                "created_at": "2024-03-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(text.id, "9b2e");
        assert_eq!(text.amount, 900.0);
        assert!(text.created_at.is_some());
    }

    #[test]
    fn test_new_expense_has_no_owner_field() {
        let payload = NewExpense {
            title: "Lunch".to_string(),
            amount: 12.0,
            category: None,
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("user_id").is_none());
        assert!(json.get("category").is_none());
        assert_eq!(json["date"], "2024-05-02");
    }

    #[test]
    fn test_blank_category_label() {
        let mut expense = Expense {
            id: "1".to_string(),
            title: "Bus".to_string(),
            amount: 2.0,
            category: Some("   ".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            user_id: "u".to_string(),
            created_at: None,
        };
        assert_eq!(expense.category_label(), None);
        expense.category = Some(" Travel ".to_string());
        assert_eq!(expense.category_label(), Some("Travel"));
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let session = Session {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            token_type: "bearer".to_string(),
            expires_in: Some(3600),
            expires_at: None,
            user: Identity::new("u", "u@example.com"),
        }
        .with_expiry_from(now);

        assert_eq!(session.expires_at, Some(now.timestamp() + 3600));
        assert!(!session.expires_within(now, 60));
        assert!(session.expires_within(now, 3600));
    }

    #[test]
    fn test_identity_null_email() {
        let identity: Identity = serde_json::from_str(r#"{"id": "x", "email": null}"#).unwrap();
        assert_eq!(identity.email, "");
    }
}
