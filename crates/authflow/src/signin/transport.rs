//! Identity-provider transport seam.
//!
//! The engine never talks to the network itself; the effect handler issues
//! opaque requests through this trait and receives structured replies. The
//! wire protocol behind an implementation is out of scope here.

use async_trait::async_trait;
use thiserror::Error;

use super::state::{ChallengeDetails, SessionTokens};

/// Failure of the underlying transport or a backend rejection surfaced
/// through it.
///
/// The executor never retries these; they travel to the resolver inside the
/// follow-up event's payload, and the resolver decides whether the flow is
/// terminal or returns to an awaiting-input state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    /// Description of what failed.
    pub message: String,
}

impl TransportError {
    /// Create a transport error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Username/password pair for a plain sign-in.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Create a credentials pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// The password never reaches logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Reply to an initiate-auth call.
#[derive(Debug, Clone, PartialEq)]
pub enum InitiateReply {
    /// The provider signed the user in directly.
    SignedIn(SessionTokens),
    /// The provider requires a challenge answer before issuing tokens.
    ChallengeRequired(ChallengeDetails),
}

/// Reply to a challenge verification call.
#[derive(Debug, Clone, PartialEq)]
pub enum ChallengeReply {
    /// The answer was accepted and tokens were issued.
    Accepted(SessionTokens),
    /// The answer was rejected; the flow may try again.
    Rejected {
        /// Provider-supplied rejection reason.
        reason: String,
    },
}

/// Transport to the identity provider.
///
/// Implementations are external collaborators: an HTTP client against a
/// real provider in production, a scriptable fake in tests.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Begin an authentication session with the given credentials.
    async fn initiate_auth(
        &self,
        credentials: &Credentials,
    ) -> Result<InitiateReply, TransportError>;

    /// Submit a challenge answer for verification.
    async fn verify_challenge(&self, answer: &str) -> Result<ChallengeReply, TransportError>;

    /// Open a hosted-UI session in the user's browser.
    async fn open_hosted_ui(&self, provider: Option<&str>) -> Result<(), TransportError>;

    /// Exchange an authorization code from the hosted-UI redirect for
    /// session tokens.
    async fn exchange_code(&self, code: &str) -> Result<SessionTokens, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_password() {
        let credentials = Credentials::new("alice", "hunter2");
        let rendered = format!("{:?}", credentials);

        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }
}
