//! Drive authentication session.
//!
//! `Unauthenticated -> Authenticating -> Authenticated`, with sign-in failure and
//! sign-out both returning to `Unauthenticated`. The credential lives only in
//! this object and is never persisted.
//!
//! Each sign-in attempt takes a generation number. Sign-out and newer attempts
//! bump it, so a stale exchange can never install its token.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::token::{SignInGrant, TokenExchange};
use super::types::AccessToken;
use crate::errors::AppError;

#[derive(Debug, Clone)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated(AccessToken),
}

/// Session state as reported to the dashboard.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

struct Inner {
    state: SessionState,
    generation: u64,
}

pub struct DriveSession {
    inner: Mutex<Inner>,
}

/// Puts an abandoned attempt back to `Unauthenticated` when its future is dropped.
struct PendingSignIn<'a> {
    session: &'a DriveSession,
    generation: u64,
}

impl Drop for PendingSignIn<'_> {
    fn drop(&mut self) {
        let mut inner = self.session.lock();
        if inner.generation == self.generation
            && matches!(inner.state, SessionState::Authenticating)
        {
            inner.state = SessionState::Unauthenticated;
            tracing::info!("Drive sign-in abandoned");
        }
    }
}

impl Default for DriveSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveSession {
    pub fn new() -> Self {
        Self::from_state(SessionState::Unauthenticated)
    }

    /// A session that starts out holding `token`.
    pub fn with_token(token: AccessToken) -> Self {
        Self::from_state(SessionState::Authenticated(token))
    }

    fn from_state(state: SessionState) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state,
                generation: 0,
            }),
        }
    }

    // Critical sections never panic, so a poisoned lock still holds a valid state.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    pub fn status(&self) -> SessionStatus {
        match &self.lock().state {
            SessionState::Unauthenticated => SessionStatus {
                state: "unauthenticated",
                expires_at: None,
            },
            SessionState::Authenticating => SessionStatus {
                state: "authenticating",
                expires_at: None,
            },
            SessionState::Authenticated(token) if token.is_expired() => SessionStatus {
                state: "expired",
                expires_at: token.expires_at(),
            },
            SessionState::Authenticated(token) => SessionStatus {
                state: "authenticated",
                expires_at: token.expires_at(),
            },
        }
    }

    /// Run one token exchange and move to `Authenticated` or back to `Unauthenticated`.
    ///
    /// Dropping the returned future mid-exchange also returns to `Unauthenticated`.
    pub async fn sign_in(
        &self,
        exchange: &TokenExchange,
        grant: &SignInGrant,
    ) -> Result<(), AppError> {
        let generation = {
            let mut inner = self.lock();
            if matches!(inner.state, SessionState::Authenticating) {
                return Err(AppError::Authentication(
                    "Drive sign-in already in progress".to_string(),
                ));
            }
            inner.generation += 1;
            inner.state = SessionState::Authenticating;
            inner.generation
        };
        let _pending = PendingSignIn {
            session: self,
            generation,
        };

        tracing::info!("Signing in to Drive");
        let result = exchange.exchange(grant).await;

        let mut inner = self.lock();
        if inner.generation != generation {
            // Signed out (and maybe signed in again) while the exchange was in flight.
            return Err(AppError::Authentication(
                "Drive sign-in cancelled by sign-out".to_string(),
            ));
        }

        match result {
            Ok(token) => {
                tracing::info!("Drive sign-in succeeded");
                inner.state = SessionState::Authenticated(token);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Drive sign-in failed: {}", e);
                inner.state = SessionState::Unauthenticated;
                Err(e)
            }
        }
    }

    pub fn sign_out(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.state = SessionState::Unauthenticated;
        tracing::info!("Signed out of Drive");
    }

    /// The current credential, or an authentication error if there is none.
    ///
    /// An expired credential ends the session.
    pub fn credential(&self) -> Result<AccessToken, AppError> {
        let mut inner = self.lock();
        let token = match &inner.state {
            SessionState::Authenticated(token) => token.clone(),
            SessionState::Authenticating => {
                return Err(AppError::Authentication(
                    "Drive sign-in still in progress".to_string(),
                ))
            }
            SessionState::Unauthenticated => {
                return Err(AppError::Authentication(
                    "Not signed in to Drive".to_string(),
                ))
            }
        };

        if token.is_expired() {
            inner.state = SessionState::Unauthenticated;
            tracing::info!("Drive credential expired");
            return Err(AppError::Authentication(
                "Drive credential expired, sign in again".to_string(),
            ));
        }

        Ok(token)
    }
}
