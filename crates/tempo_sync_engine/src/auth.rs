//! Session token management.

use crate::error::{SyncError, SyncResult};
use parking_lot::RwLock;
use tempo_sync_protocol::Millis;

/// A token expiring within this window is refreshed before use.
pub const REFRESH_WINDOW_MS: Millis = 5 * 60 * 1000;

/// A bearer session token with its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    /// Opaque token string, sent as `Authorization: Bearer <token>`.
    pub token: String,
    /// When the token expires.
    pub expires_at: Millis,
}

impl AuthToken {
    /// Creates a token.
    pub fn new(token: impl Into<String>, expires_at: Millis) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Returns true if the token has expired.
    pub fn is_expired(&self, now: Millis) -> bool {
        now >= self.expires_at
    }

    /// Returns true if the token expires within `window` of `now`.
    pub fn expires_within(&self, now: Millis, window: Millis) -> bool {
        now + window >= self.expires_at
    }
}

/// Source of session tokens.
///
/// Token issuance mechanics (credentials, keychains) live outside the sync
/// core; the client only needs the current token and a way to refresh it.
pub trait TokenProvider: Send + Sync {
    /// Returns the currently held token.
    fn current(&self) -> SyncResult<AuthToken>;

    /// Obtains a fresh token, replacing the held one.
    fn refresh(&self) -> SyncResult<AuthToken>;
}

/// Returns a token safe to use for a sync round starting at `now`.
///
/// A refresh is attempted once when the held token expires within
/// [`REFRESH_WINDOW_MS`]; refresh failure aborts as `NotAuthenticated`.
pub fn fresh_token<P: TokenProvider + ?Sized>(provider: &P, now: Millis) -> SyncResult<AuthToken> {
    let token = provider
        .current()
        .map_err(|e| SyncError::NotAuthenticated(e.to_string()))?;

    if token.expires_within(now, REFRESH_WINDOW_MS) {
        return provider
            .refresh()
            .map_err(|e| SyncError::NotAuthenticated(e.to_string()));
    }

    Ok(token)
}

/// A provider holding a fixed token, for tests and embedding scenarios
/// where the host application manages refresh itself.
pub struct StaticTokenProvider {
    token: RwLock<AuthToken>,
}

impl StaticTokenProvider {
    /// Creates a provider holding the given token.
    pub fn new(token: AuthToken) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    /// Replaces the held token.
    pub fn set_token(&self, token: AuthToken) {
        *self.token.write() = token;
    }
}

impl TokenProvider for StaticTokenProvider {
    fn current(&self) -> SyncResult<AuthToken> {
        Ok(self.token.read().clone())
    }

    fn refresh(&self) -> SyncResult<AuthToken> {
        // A static provider cannot mint new tokens; the held one is all
        // there is.
        Ok(self.token.read().clone())
    }
}
