//! Sign-in flow effects.

use super::state::FlowId;
use super::transport::Credentials;

/// Asynchronous work a transition asks the executor to perform.
///
/// Descriptions only — the effect handler interprets them against the
/// identity-provider transport and produces the matching completion event.
#[derive(Debug, Clone, PartialEq)]
pub enum SignInEffect {
    /// Call the provider's initiate-auth operation.
    CallInitiateAuth {
        flow_id: FlowId,
        credentials: Credentials,
    },

    /// Verify a challenge answer with the provider.
    VerifyChallenge {
        flow_id: FlowId,
        answer: String,
        /// Which attempt this answer is (1-based), for logging.
        attempt: u32,
    },

    /// Open the hosted-UI session in the user's browser.
    OpenHostedUi {
        flow_id: FlowId,
        provider: Option<String>,
    },

    /// Exchange the redirect's authorization code for tokens.
    ExchangeAuthorizationCode { flow_id: FlowId, code: String },
}

impl SignInEffect {
    /// Stable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SignInEffect::CallInitiateAuth { .. } => "callInitiateAuth",
            SignInEffect::VerifyChallenge { .. } => "verifyChallenge",
            SignInEffect::OpenHostedUi { .. } => "openHostedUi",
            SignInEffect::ExchangeAuthorizationCode { .. } => "exchangeAuthorizationCode",
        }
    }

    /// The flow that dispatched this effect.
    pub fn flow_id(&self) -> FlowId {
        match self {
            SignInEffect::CallInitiateAuth { flow_id, .. }
            | SignInEffect::VerifyChallenge { flow_id, .. }
            | SignInEffect::OpenHostedUi { flow_id, .. }
            | SignInEffect::ExchangeAuthorizationCode { flow_id, .. } => *flow_id,
        }
    }
}
