//! Root sign-in resolver, composed from per-flow-family arms.
//!
//! One resolver drives one machine, and one machine drives one flow at a
//! time. Each family (password, challenge, hosted UI) resolves its own
//! stimuli; cancellation and timeouts are shared lifecycle arms. All arms
//! are pure — the executor owns every source of non-determinism.

use crate::config::FlowConfig;
use crate::error::AuthError;
use crate::resolver::{MachineEvent, MachineState, Resolution, Resolver, Transition};

use super::effect::SignInEffect;
use super::event::SignInEvent;
use super::state::{SignInMethod, SignInState};
use super::transport::{ChallengeReply, InitiateReply};

type SignInResolution = Resolution<SignInState, SignInEffect, SignInEvent>;

/// Pure transition logic for the sign-in flow family.
pub struct SignInResolver {
    config: FlowConfig,
}

impl SignInResolver {
    /// Create a resolver with the given flow configuration.
    pub fn new(config: FlowConfig) -> Self {
        Self { config }
    }

    /// Username/password arms: initiation and the initiate-auth result.
    fn resolve_password(&self, state: &SignInState, event: &SignInEvent) -> SignInResolution {
        match (state, event) {
            (
                state,
                SignInEvent::InitiatePasswordSignIn {
                    flow_id,
                    credentials,
                },
            ) if ready_for_new_flow(state) => Transition::to(SignInState::Initiating {
                flow_id: *flow_id,
                method: SignInMethod::Password,
            })
            .with_effect(SignInEffect::CallInitiateAuth {
                flow_id: *flow_id,
                credentials: credentials.clone(),
            })
            .with_timer_after(
                self.config.sign_in_timeout,
                SignInEvent::TimedOut { flow_id: *flow_id },
            )
            .into(),

            (
                SignInState::Initiating {
                    flow_id,
                    method: SignInMethod::Password,
                },
                SignInEvent::AuthInitiated {
                    flow_id: event_flow,
                    outcome,
                    ..
                },
            ) if event_flow == flow_id => match outcome {
                Ok(InitiateReply::SignedIn(session)) => Transition::to(SignInState::SignedIn {
                    flow_id: *flow_id,
                    session: session.clone(),
                })
                .into(),
                Ok(InitiateReply::ChallengeRequired(challenge)) => {
                    Transition::to(SignInState::AwaitingChallenge {
                        flow_id: *flow_id,
                        challenge: challenge.clone(),
                        attempts: 0,
                        verifying: false,
                    })
                    .into()
                }
                Err(error) => Transition::to(SignInState::Error {
                    flow_id: Some(*flow_id),
                    error: AuthError::transport(error.message.clone()),
                })
                .into(),
            },

            // The flow was cancelled or superseded after the effect was
            // dispatched; its late result changes nothing.
            (_, SignInEvent::AuthInitiated { .. }) => Resolution::Stale,

            _ => Resolution::Unexpected,
        }
    }

    /// Challenge arms: answer submission and the verification result.
    fn resolve_challenge(&self, state: &SignInState, event: &SignInEvent) -> SignInResolution {
        match (state, event) {
            (
                SignInState::AwaitingChallenge {
                    flow_id,
                    challenge,
                    attempts,
                    verifying: false,
                },
                SignInEvent::SubmitChallengeAnswer {
                    flow_id: event_flow,
                    answer,
                },
            ) if event_flow == flow_id => Transition::to(SignInState::AwaitingChallenge {
                flow_id: *flow_id,
                challenge: challenge.clone(),
                attempts: *attempts,
                verifying: true,
            })
            .with_effect(SignInEffect::VerifyChallenge {
                flow_id: *flow_id,
                answer: answer.clone(),
                attempt: attempts + 1,
            })
            .into(),

            // A verification is already in flight; duplicate answers are
            // ignored rather than dispatched twice.
            (
                SignInState::AwaitingChallenge {
                    flow_id,
                    verifying: true,
                    ..
                },
                SignInEvent::SubmitChallengeAnswer {
                    flow_id: event_flow, ..
                },
            ) if event_flow == flow_id => Resolution::Stale,

            (
                SignInState::AwaitingChallenge {
                    flow_id,
                    challenge,
                    attempts,
                    verifying: true,
                },
                SignInEvent::ChallengeVerified {
                    flow_id: event_flow,
                    outcome,
                    ..
                },
            ) if event_flow == flow_id => {
                let attempts = attempts + 1;
                match outcome {
                    Ok(ChallengeReply::Accepted(session)) => {
                        Transition::to(SignInState::SignedIn {
                            flow_id: *flow_id,
                            session: session.clone(),
                        })
                        .into()
                    }
                    Ok(ChallengeReply::Rejected { .. }) => {
                        if attempts >= self.config.max_challenge_attempts {
                            Transition::to(SignInState::Error {
                                flow_id: Some(*flow_id),
                                error: AuthError::ChallengeAttemptsExceeded { attempts },
                            })
                            .into()
                        } else {
                            Transition::to(SignInState::AwaitingChallenge {
                                flow_id: *flow_id,
                                challenge: challenge.clone(),
                                attempts,
                                verifying: false,
                            })
                            .into()
                        }
                    }
                    Err(error) => Transition::to(SignInState::Error {
                        flow_id: Some(*flow_id),
                        error: AuthError::transport(error.message.clone()),
                    })
                    .into(),
                }
            }

            // Stray answers after the flow concluded, or for a flow this
            // machine is no longer driving.
            (state, SignInEvent::SubmitChallengeAnswer { .. }) if state.is_terminal() => {
                Resolution::Stale
            }
            (state, SignInEvent::SubmitChallengeAnswer { flow_id, .. })
                if state.flow_id().is_some_and(|id| id != *flow_id) =>
            {
                Resolution::Stale
            }

            (_, SignInEvent::ChallengeVerified { .. }) => Resolution::Stale,

            _ => Resolution::Unexpected,
        }
    }

    /// Hosted-UI arms: initiation, session opening, redirect, code exchange.
    fn resolve_hosted_ui(&self, state: &SignInState, event: &SignInEvent) -> SignInResolution {
        match (state, event) {
            (state, SignInEvent::InitiateHostedUiSignIn { flow_id, provider })
                if ready_for_new_flow(state) =>
            {
                Transition::to(SignInState::Initiating {
                    flow_id: *flow_id,
                    method: SignInMethod::HostedUi,
                })
                .with_effect(SignInEffect::OpenHostedUi {
                    flow_id: *flow_id,
                    provider: provider.clone(),
                })
                .with_timer_after(
                    self.config.hosted_ui_timeout,
                    SignInEvent::TimedOut { flow_id: *flow_id },
                )
                .into()
            }

            (
                SignInState::Initiating {
                    flow_id,
                    method: SignInMethod::HostedUi,
                },
                SignInEvent::HostedUiOpened {
                    flow_id: event_flow,
                    outcome,
                    ..
                },
            ) if event_flow == flow_id => match outcome {
                Ok(()) => Transition::to(SignInState::ResolvingHostedUi {
                    flow_id: *flow_id,
                    exchanging: false,
                })
                .into(),
                Err(error) => Transition::to(SignInState::Error {
                    flow_id: Some(*flow_id),
                    error: AuthError::transport(error.message.clone()),
                })
                .into(),
            },

            (
                SignInState::ResolvingHostedUi {
                    flow_id,
                    exchanging: false,
                },
                SignInEvent::CompleteHostedUiRedirect {
                    flow_id: event_flow,
                    code,
                },
            ) if event_flow == flow_id => Transition::to(SignInState::ResolvingHostedUi {
                flow_id: *flow_id,
                exchanging: true,
            })
            .with_effect(SignInEffect::ExchangeAuthorizationCode {
                flow_id: *flow_id,
                code: code.clone(),
            })
            .into(),

            // An exchange is already in flight; duplicate redirects are
            // ignored rather than exchanged twice.
            (
                SignInState::ResolvingHostedUi {
                    flow_id,
                    exchanging: true,
                },
                SignInEvent::CompleteHostedUiRedirect {
                    flow_id: event_flow, ..
                },
            ) if event_flow == flow_id => Resolution::Stale,

            (
                SignInState::ResolvingHostedUi {
                    flow_id,
                    exchanging: true,
                },
                SignInEvent::CodeExchanged {
                    flow_id: event_flow,
                    outcome,
                    ..
                },
            ) if event_flow == flow_id => match outcome {
                Ok(session) => Transition::to(SignInState::SignedIn {
                    flow_id: *flow_id,
                    session: session.clone(),
                })
                .into(),
                Err(error) => Transition::to(SignInState::Error {
                    flow_id: Some(*flow_id),
                    error: AuthError::transport(error.message.clone()),
                })
                .into(),
            },

            (state, SignInEvent::CompleteHostedUiRedirect { .. }) if state.is_terminal() => {
                Resolution::Stale
            }
            (state, SignInEvent::CompleteHostedUiRedirect { flow_id, .. })
                if state.flow_id().is_some_and(|id| id != *flow_id) =>
            {
                Resolution::Stale
            }

            (_, SignInEvent::HostedUiOpened { .. } | SignInEvent::CodeExchanged { .. }) => {
                Resolution::Stale
            }

            _ => Resolution::Unexpected,
        }
    }

    /// Shared lifecycle arms: cancellation and timeouts.
    ///
    /// Both target whatever state is current; when the flow they name has
    /// already concluded or been superseded, they resolve as stale so a
    /// terminal state is never exited by a late stimulus.
    fn resolve_lifecycle(&self, state: &SignInState, event: &SignInEvent) -> SignInResolution {
        match (state, event) {
            (state, SignInEvent::Cancel { flow_id })
                if state.flow_id() == Some(*flow_id) && !state.is_terminal() =>
            {
                Transition::to(SignInState::Cancelled { flow_id: *flow_id }).into()
            }
            (_, SignInEvent::Cancel { .. }) => Resolution::Stale,

            (state, SignInEvent::TimedOut { flow_id })
                if state.flow_id() == Some(*flow_id) && !state.is_terminal() =>
            {
                Transition::to(SignInState::Error {
                    flow_id: Some(*flow_id),
                    error: AuthError::FlowTimedOut,
                })
                .into()
            }
            (_, SignInEvent::TimedOut { .. }) => Resolution::Stale,

            _ => Resolution::Unexpected,
        }
    }
}

impl Default for SignInResolver {
    fn default() -> Self {
        Self::new(FlowConfig::default())
    }
}

impl Resolver for SignInResolver {
    type State = SignInState;
    type Event = SignInEvent;
    type Effect = SignInEffect;

    fn resolve(&self, state: &SignInState, event: &SignInEvent) -> SignInResolution {
        match event {
            SignInEvent::InitiatePasswordSignIn { .. } | SignInEvent::AuthInitiated { .. } => {
                self.resolve_password(state, event)
            }
            SignInEvent::SubmitChallengeAnswer { .. } | SignInEvent::ChallengeVerified { .. } => {
                self.resolve_challenge(state, event)
            }
            SignInEvent::InitiateHostedUiSignIn { .. }
            | SignInEvent::HostedUiOpened { .. }
            | SignInEvent::CompleteHostedUiRedirect { .. }
            | SignInEvent::CodeExchanged { .. } => self.resolve_hosted_ui(state, event),
            SignInEvent::Cancel { .. } | SignInEvent::TimedOut { .. } => {
                self.resolve_lifecycle(state, event)
            }
        }
    }

    fn on_unexpected(&self, state: &SignInState, event: &SignInEvent) -> SignInState {
        SignInState::Error {
            flow_id: state.flow_id(),
            error: AuthError::ProtocolViolation {
                state: state.info().status,
                event: event.kind().to_string(),
            },
        }
    }
}

/// A new flow may begin from the pristine state or from any terminal one.
fn ready_for_new_flow(state: &SignInState) -> bool {
    matches!(state, SignInState::NotStarted) || state.is_terminal()
}
