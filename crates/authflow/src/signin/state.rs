//! Sign-in flow states.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;
use crate::introspection::StateInfo;
use crate::resolver::MachineState;

/// Correlates the states, events, and effects of one flow.
///
/// Every initiation mints a fresh id; a helper only reacts to terminal
/// states carrying its own id, which is what keeps one machine safe to
/// reuse across consecutive flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowId(Uuid);

impl FlowId {
    /// Mint a fresh flow id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FlowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FlowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// How a flow was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInMethod {
    /// Username/password against the identity provider.
    Password,
    /// Browser-based hosted UI with a redirect back into the app.
    HostedUi,
}

impl SignInMethod {
    /// Stable label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignInMethod::Password => "password",
            SignInMethod::HostedUi => "hostedUi",
        }
    }
}

/// The kind of challenge the provider raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeKind {
    /// One-time code delivered over SMS.
    SmsCode,
    /// Code from a TOTP authenticator app.
    TotpCode,
    /// Provider-defined custom challenge.
    Custom,
}

impl ChallengeKind {
    /// Stable label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeKind::SmsCode => "smsCode",
            ChallengeKind::TotpCode => "totpCode",
            ChallengeKind::Custom => "custom",
        }
    }
}

/// Challenge parameters surfaced by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeDetails {
    /// What kind of answer the provider expects.
    pub kind: ChallengeKind,

    /// Masked delivery destination (e.g. `+***-**34`), when the provider
    /// supplies one.
    pub destination: Option<String>,
}

/// Tokens issued on successful sign-in.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    /// Short-lived access token.
    pub access_token: String,

    /// Identity token, when the provider issues one.
    pub id_token: Option<String>,

    /// Long-lived refresh token, when the provider issues one.
    pub refresh_token: Option<String>,

    /// Access token lifetime in seconds.
    pub expires_in_secs: u64,
}

// Token material stays out of logs; only the lifetime is printable.
impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"<redacted>")
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in_secs", &self.expires_in_secs)
            .finish()
    }
}

/// Phases of a sign-in flow.
///
/// States are immutable values; the engine produces a new one per
/// transition. `SignedIn`, `Cancelled`, and `Error` are terminal — the
/// machine stays there until a new flow re-initiates.
#[derive(Debug, Clone, PartialEq)]
pub enum SignInState {
    /// No flow has run on this machine yet.
    NotStarted,

    /// The initiating effect has been dispatched; awaiting the provider.
    Initiating {
        flow_id: FlowId,
        method: SignInMethod,
    },

    /// The provider raised a challenge and the flow is waiting for (or
    /// verifying) an answer.
    AwaitingChallenge {
        flow_id: FlowId,
        challenge: ChallengeDetails,
        /// Answers consumed so far, counting the one in flight.
        attempts: u32,
        /// A verification effect is outstanding; duplicate submissions are
        /// ignored until it completes.
        verifying: bool,
    },

    /// The hosted UI session is open; waiting for the redirect and then the
    /// code exchange.
    ResolvingHostedUi {
        flow_id: FlowId,
        /// A code-exchange effect is outstanding; duplicate redirect
        /// completions are ignored until it completes.
        exchanging: bool,
    },

    /// Terminal: the provider issued session tokens.
    SignedIn {
        flow_id: FlowId,
        session: SessionTokens,
    },

    /// Terminal: the caller cancelled the flow.
    Cancelled { flow_id: FlowId },

    /// Terminal: the flow failed. `flow_id` is absent when the failure was
    /// a protocol violation before any flow existed.
    Error {
        flow_id: Option<FlowId>,
        error: AuthError,
    },
}

impl SignInState {
    /// The flow this state belongs to, if any.
    pub fn flow_id(&self) -> Option<FlowId> {
        match self {
            SignInState::NotStarted => None,
            SignInState::Initiating { flow_id, .. }
            | SignInState::AwaitingChallenge { flow_id, .. }
            | SignInState::ResolvingHostedUi { flow_id, .. }
            | SignInState::SignedIn { flow_id, .. }
            | SignInState::Cancelled { flow_id } => Some(*flow_id),
            SignInState::Error { flow_id, .. } => *flow_id,
        }
    }
}

impl MachineState for SignInState {
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            SignInState::SignedIn { .. } | SignInState::Cancelled { .. } | SignInState::Error { .. }
        )
    }

    fn info(&self) -> StateInfo {
        match self {
            SignInState::NotStarted => StateInfo::new("notStarted"),
            SignInState::Initiating { flow_id, method } => StateInfo::new("initiating")
                .with_field("flow_id", flow_id)
                .with_field("method", &method.as_str()),
            SignInState::AwaitingChallenge {
                flow_id,
                challenge,
                attempts,
                verifying,
            } => StateInfo::new("awaitingChallenge")
                .with_field("flow_id", flow_id)
                .with_field("challenge", &challenge.kind.as_str())
                .with_numeric_field("attempts", f64::from(*attempts))
                .with_bool_field("verifying", *verifying),
            SignInState::ResolvingHostedUi { flow_id, exchanging } => {
                StateInfo::new("resolvingHostedUi")
                    .with_field("flow_id", flow_id)
                    .with_bool_field("exchanging", *exchanging)
            }
            SignInState::SignedIn { flow_id, session } => StateInfo::new("signedIn")
                .with_field("flow_id", flow_id)
                .with_numeric_field("expires_in_secs", session.expires_in_secs as f64)
                .terminal(true),
            SignInState::Cancelled { flow_id } => StateInfo::new("cancelled")
                .with_field("flow_id", flow_id)
                .terminal(true),
            SignInState::Error { flow_id, error } => {
                let info = StateInfo::new("error").with_field("error", error).terminal(true);
                match flow_id {
                    Some(flow_id) => info.with_field("flow_id", flow_id),
                    None => info,
                }
            }
        }
    }
}
