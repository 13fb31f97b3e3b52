//! Failure taxonomy for the two calls the client makes.
//!
//! Both kinds are recovered locally: an `AuthFailure` leaves the session
//! absent for the rest of the process, a `DispatchFailure` clears the
//! in-flight flag and leaves the conversation untouched. Neither is ever
//! rendered as a conversation message.

use thiserror::Error;

/// The token endpoint could not produce a session token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("token endpoint unreachable: {0}")]
    Transport(String),

    #[error("token endpoint returned HTTP {0}")]
    Status(u16),

    #[error("token response malformed: {0}")]
    MalformedBody(String),
}

/// A chat exchange did not yield a usable answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchFailure {
    #[error("chat endpoint unreachable: {0}")]
    Transport(String),

    #[error("chat endpoint returned HTTP {0}")]
    Status(u16),

    #[error("chat response malformed: {0}")]
    MalformedBody(String),

    /// The task awaiting the response went away before it settled.
    #[error("exchange abandoned before a response arrived")]
    Abandoned,
}

impl DispatchFailure {
    /// 403 from the chat endpoint is what an expired token looks like.
    pub fn looks_like_expired_token(&self) -> bool {
        matches!(self, DispatchFailure::Status(403))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown employment type '{0}' (expected Tillsvidare or Säsong/Visstid)")]
pub struct UnknownEmploymentType(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_token_hint_only_for_403() {
        assert!(DispatchFailure::Status(403).looks_like_expired_token());
        assert!(!DispatchFailure::Status(500).looks_like_expired_token());
        assert!(!DispatchFailure::Abandoned.looks_like_expired_token());
    }
}
