//! Session token acquisition.
//!
//! One token per process, fetched once at startup. There is no refresh and
//! no retry: if the fetch fails the session stays absent and every dispatch
//! is refused until the process exits.

use std::fmt;

use crate::client::AnsweringService;
use crate::error::AuthFailure;

/// Opaque credential sent with every chat exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<SessionToken>,
}

impl Session {
    pub fn absent() -> Self {
        Self { token: None }
    }

    pub fn with_token(token: SessionToken) -> Self {
        Self { token: Some(token) }
    }

    pub fn token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    pub fn is_established(&self) -> bool {
        self.token.is_some()
    }
}

/// Fetch the session token. One request, no retry.
pub async fn acquire_token(service: &dyn AnsweringService, key: &str) -> Result<Session, AuthFailure> {
    let token = service.fetch_token(key).await?;
    Ok(Session::with_token(token))
}

/// Startup wrapper: an `AuthFailure` is logged and yields an absent session.
pub async fn establish(service: &dyn AnsweringService, key: Option<&str>) -> Session {
    let Some(key) = key else {
        tracing::warn!("no access key configured; chat stays disabled");
        return Session::absent();
    };
    match acquire_token(service, key).await {
        Ok(session) => {
            tracing::info!("session token acquired");
            session
        }
        Err(e) => {
            tracing::warn!(error = %e, "session token unavailable; chat stays disabled");
            Session::absent()
        }
    }
}
