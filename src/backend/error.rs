//! Backend error types

use thiserror::Error;

/// Errors that can occur when talking to the backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The call needs a session and none is active
    #[error("Auth session missing")]
    SessionMissing,

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Request timeout")]
    Timeout,
}

impl BackendError {
    /// Classify a transport error the way the rest of the client reports it
    pub(crate) fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return BackendError::Timeout;
        }
        #[cfg(not(target_arch = "wasm32"))]
        if e.is_connect() {
            return BackendError::Unavailable;
        }
        BackendError::Request(e)
    }

    /// Build an API error from a status code and a raw body.
    ///
    /// Auth endpoints answer with `msg` or `error_description`, the REST
    /// endpoints with `message`; fall back to the raw text.
    pub fn from_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                ["msg", "error_description", "message", "error"]
                    .iter()
                    .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.trim().to_string());

        BackendError::Api { status, message }
    }

    /// The server refused the request outright. Retrying with the same
    /// input will not help, unlike transport failures and 5xx answers.
    pub fn is_rejection(&self) -> bool {
        matches!(self, BackendError::Api { status, .. } if (400..500).contains(status))
    }

    /// Short text for status lines and alerts
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Api { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_auth_body() {
        let err = BackendError::from_body(400, r#"{"code":400,"msg":"Invalid login credentials"}"#);
        assert_eq!(err.user_message(), "Invalid login credentials");

        let err = BackendError::from_body(
            400,
            r#"{"error":"invalid_grant","error_description":"Refresh Token Not Found"}"#,
        );
        assert_eq!(err.user_message(), "Refresh Token Not Found");
    }

    #[test]
    fn test_message_from_rest_body() {
        let err = BackendError::from_body(
            403,
            r#"{"code":"42501","message":"new row violates row-level security policy"}"#,
        );
        assert_eq!(err.user_message(), "new row violates row-level security policy");
        assert!(matches!(err, BackendError::Api { status: 403, .. }));
    }

    #[test]
    fn test_rejection_is_client_error_only() {
        assert!(BackendError::from_body(400, r#"{"error":"invalid_grant"}"#).is_rejection());
        assert!(BackendError::from_body(401, "").is_rejection());
        assert!(!BackendError::from_body(503, "").is_rejection());
        assert!(!BackendError::Unavailable.is_rejection());
        assert!(!BackendError::Timeout.is_rejection());
    }

    #[test]
    fn test_message_from_plain_body() {
        let err = BackendError::from_body(502, "  Bad Gateway \n");
        assert_eq!(err.user_message(), "Bad Gateway");
        assert_eq!(err.to_string(), "API error 502: Bad Gateway");
    }
}
