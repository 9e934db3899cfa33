use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Longest lifetime accepted from a token endpoint; larger `expires_in`
/// values are clamped to it.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 24 * 60 * 60);

/// App access token obtained through the client-credentials grant.
///
/// Replaced wholesale on refresh; never mutated in place.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: Instant,
    pub obtained_at: Instant,
}

impl Credential {
    pub fn new(access_token: String, token_type: String, expires_in: Duration) -> Self {
        let now = Instant::now();
        Self {
            access_token,
            token_type,
            expires_at: now
                .checked_add(expires_in.min(MAX_TOKEN_LIFETIME))
                .unwrap_or(now),
            obtained_at: now,
        }
    }

    /// True once `now` is inside the safety margin before expiry.
    pub fn needs_refresh(&self, safety_margin: Duration) -> bool {
        Instant::now() + safety_margin >= self.expires_at
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

// Keep the token itself out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("remaining", &self.remaining())
            .finish()
    }
}
