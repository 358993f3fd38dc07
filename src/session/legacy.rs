//! Legacy token parsing
//!
//! Older client versions kept their session under `supabase.auth.token`,
//! either flat or wrapped in `currentSession` / `current_session`, with
//! snake_case or camelCase token names. Anything unreadable means "no session".

use serde_json::Value;

/// Local storage key written by older client versions
pub const LEGACY_TOKEN_KEY: &str = "supabase.auth.token";

/// Token pair recovered from a legacy entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Extract a usable token pair from a raw legacy value
pub fn parse_legacy_tokens(raw: &str) -> Option<LegacyTokens> {
    let parsed: Value = serde_json::from_str(raw).ok()?;

    let current = ["currentSession", "current_session"]
        .iter()
        .find_map(|k| parsed.get(*k).filter(|v| !v.is_null()))
        .unwrap_or(&parsed);

    let access_token = first_token(current, &["access_token", "accessToken"])?;
    let refresh_token = first_token(current, &["refresh_token", "refreshToken"])?;

    Some(LegacyTokens {
        access_token,
        refresh_token,
    })
}

/// First non-empty string among `keys`; empty strings count as missing
fn first_token(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        value
            .get(*k)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(access: &str, refresh: &str) -> Option<LegacyTokens> {
        Some(LegacyTokens {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        })
    }

    #[test]
    fn test_flat_snake_case() {
        let raw = r#"{"access_token": "a1", "refresh_token": "r1"}"#;
        assert_eq!(parse_legacy_tokens(raw), tokens("a1", "r1"));
    }

    #[test]
    fn test_flat_camel_case() {
        let raw = r#"{"accessToken": "a2", "refreshToken": "r2"}"#;
        assert_eq!(parse_legacy_tokens(raw), tokens("a2", "r2"));
    }

    #[test]
    fn test_wrapped_current_session() {
        let raw = r#"{"currentSession": {"access_token": "a3", "refresh_token": "r3"},
                      "expiresAt": 1700000000}"#;
        assert_eq!(parse_legacy_tokens(raw), tokens("a3", "r3"));

        let raw = r#"{"current_session": {"accessToken": "a4", "refresh_token": "r4"}}"#;
        assert_eq!(parse_legacy_tokens(raw), tokens("a4", "r4"));
    }

    #[test]
    fn test_null_wrapper_falls_through() {
        let raw = r#"{"currentSession": null, "access_token": "a5", "refresh_token": "r5"}"#;
        assert_eq!(parse_legacy_tokens(raw), tokens("a5", "r5"));
    }

    #[test]
    fn test_snake_case_wins_over_camel_case() {
        let raw = r#"{"access_token": "snake", "accessToken": "camel", "refresh_token": "r"}"#;
        assert_eq!(parse_legacy_tokens(raw), tokens("snake", "r"));
    }

    #[test]
    fn test_malformed_values_yield_none() {
        let cases = [
            "",
            "not json",
            "{",
            "null",
            "42",
            "\"a string\"",
            "[]",
            "{}",
            r#"{"access_token": "a"}"#,
            r#"{"refresh_token": "r"}"#,
            r#"{"access_token": "", "refresh_token": "r"}"#,
            r#"{"access_token": 1, "refresh_token": 2}"#,
            r#"{"currentSession": {"access_token": "a"}}"#,
            r#"{"currentSession": "garbage"}"#,
        ];

        for raw in cases {
            assert_eq!(parse_legacy_tokens(raw), None, "input: {raw:?}");
        }
    }
}
