//! Sign-in flow events.

use crate::effect::EffectId;
use crate::resolver::MachineEvent;

use super::state::{FlowId, SessionTokens};
use super::transport::{ChallengeReply, Credentials, InitiateReply, TransportError};

/// Stimuli a sign-in flow reacts to.
///
/// Caller-initiated requests mint the flow id; effect results carry both
/// the flow id and the id of the effect that produced them, so late results
/// from a superseded flow resolve as stale instead of corrupting the
/// current one.
#[derive(Debug, Clone, PartialEq)]
pub enum SignInEvent {
    /// Begin a username/password flow.
    InitiatePasswordSignIn {
        flow_id: FlowId,
        credentials: Credentials,
    },

    /// Begin a hosted-UI flow.
    InitiateHostedUiSignIn {
        flow_id: FlowId,
        /// Optional provider hint (e.g. a social login shortcut).
        provider: Option<String>,
    },

    /// The initiate-auth effect completed.
    AuthInitiated {
        effect_id: EffectId,
        flow_id: FlowId,
        outcome: Result<InitiateReply, TransportError>,
    },

    /// The caller answered the pending challenge.
    SubmitChallengeAnswer { flow_id: FlowId, answer: String },

    /// The challenge verification effect completed.
    ChallengeVerified {
        effect_id: EffectId,
        flow_id: FlowId,
        outcome: Result<ChallengeReply, TransportError>,
    },

    /// The open-hosted-UI effect completed.
    HostedUiOpened {
        effect_id: EffectId,
        flow_id: FlowId,
        outcome: Result<(), TransportError>,
    },

    /// The user's browser came back with an authorization code.
    CompleteHostedUiRedirect { flow_id: FlowId, code: String },

    /// The code-exchange effect completed.
    CodeExchanged {
        effect_id: EffectId,
        flow_id: FlowId,
        outcome: Result<SessionTokens, TransportError>,
    },

    /// The caller cancelled the flow.
    Cancel { flow_id: FlowId },

    /// The flow's deadline elapsed without a terminal state.
    TimedOut { flow_id: FlowId },
}

impl SignInEvent {
    /// The flow this event targets.
    pub fn flow_id(&self) -> FlowId {
        match self {
            SignInEvent::InitiatePasswordSignIn { flow_id, .. }
            | SignInEvent::InitiateHostedUiSignIn { flow_id, .. }
            | SignInEvent::AuthInitiated { flow_id, .. }
            | SignInEvent::SubmitChallengeAnswer { flow_id, .. }
            | SignInEvent::ChallengeVerified { flow_id, .. }
            | SignInEvent::HostedUiOpened { flow_id, .. }
            | SignInEvent::CompleteHostedUiRedirect { flow_id, .. }
            | SignInEvent::CodeExchanged { flow_id, .. }
            | SignInEvent::Cancel { flow_id }
            | SignInEvent::TimedOut { flow_id } => *flow_id,
        }
    }
}

impl MachineEvent for SignInEvent {
    fn kind(&self) -> &'static str {
        match self {
            SignInEvent::InitiatePasswordSignIn { .. } => "initiatePasswordSignIn",
            SignInEvent::InitiateHostedUiSignIn { .. } => "initiateHostedUiSignIn",
            SignInEvent::AuthInitiated { .. } => "authInitiated",
            SignInEvent::SubmitChallengeAnswer { .. } => "submitChallengeAnswer",
            SignInEvent::ChallengeVerified { .. } => "challengeVerified",
            SignInEvent::HostedUiOpened { .. } => "hostedUiOpened",
            SignInEvent::CompleteHostedUiRedirect { .. } => "completeHostedUiRedirect",
            SignInEvent::CodeExchanged { .. } => "codeExchanged",
            SignInEvent::Cancel { .. } => "cancel",
            SignInEvent::TimedOut { .. } => "timedOut",
        }
    }
}
