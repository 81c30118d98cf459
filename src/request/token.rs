//! Client tokens.
//!
//! A client token travels in every request and is echoed in the response,
//! which makes it the correlation key for pending operations. Generated
//! tokens come from a process-wide counter, so two live operations never
//! share one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::info::MAX_CLIENT_TOKEN_LEN;
use crate::error::{JobsError, Result};
use crate::json;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Correlation key of one operation, stored without quotes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientToken(String);

impl ClientToken {
    /// Wrap a token string. The caller is responsible for validation.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Generate a fresh token.
    pub fn generate() -> Self {
        let n = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        Self(format!("{:016x}", n))
    }

    /// Build a token from a quoted string span as found in a document.
    pub fn from_span(span: &[u8]) -> Option<Self> {
        let inner = json::unquote(span)?;
        std::str::from_utf8(inner).ok().map(|s| Self(s.to_string()))
    }

    /// The token text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

/// Check a caller-supplied token.
///
/// Tokens are emitted without escaping, so quotes, backslashes and control
/// characters are refused.
pub fn validate_client_token(token: &str) -> Result<()> {
    if token.is_empty() || token.len() > MAX_CLIENT_TOKEN_LEN {
        return Err(JobsError::BadParameter(format!(
            "client token length must be 1..={}, got {}",
            MAX_CLIENT_TOKEN_LEN,
            token.len()
        )));
    }

    if token.bytes().any(|b| b == b'"' || b == b'\\' || b.is_ascii_control()) {
        return Err(JobsError::BadParameter(format!(
            "client token {:?} contains characters that need escaping",
            token
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_unique() {
        let a = ClientToken::generate();
        let b = ClientToken::generate();
        assert_ne!(a, b);
        assert!(validate_client_token(a.as_str()).is_ok());
    }

    #[test]
    fn test_from_span() {
        assert_eq!(ClientToken::from_span(br#""test""#), Some(ClientToken::from("test")));
        assert_eq!(ClientToken::from_span(b"test"), None);
        assert_eq!(ClientToken::from_span(b"12"), None);
    }

    #[test]
    fn test_validation() {
        assert!(validate_client_token("test").is_ok());
        assert!(validate_client_token(&"t".repeat(MAX_CLIENT_TOKEN_LEN)).is_ok());
        assert!(validate_client_token("").is_err());
        assert!(validate_client_token(&"t".repeat(MAX_CLIENT_TOKEN_LEN + 1)).is_err());
        assert!(validate_client_token("a\"b").is_err());
        assert!(validate_client_token("a\\b").is_err());
        assert!(validate_client_token("a\nb").is_err());
    }
}
