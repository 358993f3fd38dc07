//! Session management
//!
//! - [`store`]: the process-wide [`SessionStore`]
//! - [`legacy`]: reading tokens left behind by older client versions

pub mod legacy;
pub mod store;

pub use legacy::{parse_legacy_tokens, LegacyTokens, LEGACY_TOKEN_KEY};
pub use store::{SessionStore, APP_USER_KEY};
