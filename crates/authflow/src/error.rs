//! Error types for authflow.

use thiserror::Error;

/// Failures a sign-in flow can terminate with.
///
/// Every failure inside the engine is resolved locally into a state
/// transition; nothing is thrown across the engine boundary. The only
/// externally visible failure is an operation's terminal result carrying one
/// of these variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The underlying transport to the identity provider failed, or the
    /// provider rejected the request.
    #[error("transport failure: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// An event arrived that has no defined transition from the current
    /// state. Protocol violations fail the flow instead of being dropped.
    #[error("event `{event}` is not valid in state `{state}`")]
    ProtocolViolation {
        /// Status label of the state the event was resolved against.
        state: String,
        /// Kind label of the offending event.
        event: String,
    },

    /// The flow did not reach a terminal state before its deadline.
    #[error("sign-in flow timed out")]
    FlowTimedOut,

    /// The challenge was answered incorrectly too many times.
    #[error("challenge attempt limit reached after {attempts} attempts")]
    ChallengeAttemptsExceeded {
        /// Number of attempts consumed.
        attempts: u32,
    },

    /// The flow was cancelled by the caller.
    #[error("sign-in was cancelled")]
    Cancelled,
}

impl AuthError {
    /// Create a transport error from any displayable source.
    pub fn transport(message: impl Into<String>) -> Self {
        AuthError::Transport {
            message: message.into(),
        }
    }
}
