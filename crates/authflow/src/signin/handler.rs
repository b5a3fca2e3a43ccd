//! Executes sign-in effects against the identity provider.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::effect::{EffectContext, EffectHandler};

use super::effect::SignInEffect;
use super::event::SignInEvent;
use super::transport::IdentityProvider;

/// Interprets [`SignInEffect`] descriptions against a transport.
///
/// Failures are never thrown and never retried here — they travel to the
/// resolver inside the completion event's payload. Retries, where the flow
/// supports them (challenge resubmission), are ordinary resolver
/// transitions back to an awaiting-input state.
pub struct SignInEffectHandler<P> {
    provider: Arc<P>,
}

impl<P: IdentityProvider> SignInEffectHandler<P> {
    /// Create a handler over the given provider transport.
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }
}

#[async_trait]
impl<P: IdentityProvider> EffectHandler<SignInEffect, SignInEvent> for SignInEffectHandler<P> {
    async fn handle(&self, effect: SignInEffect, ctx: &EffectContext) -> SignInEvent {
        debug!(
            effect = effect.kind(),
            effect_id = %ctx.effect_id,
            flow_id = %effect.flow_id(),
            "executing sign-in effect"
        );

        match effect {
            SignInEffect::CallInitiateAuth {
                flow_id,
                credentials,
            } => {
                let outcome = self.provider.initiate_auth(&credentials).await;
                SignInEvent::AuthInitiated {
                    effect_id: ctx.effect_id,
                    flow_id,
                    outcome,
                }
            }

            SignInEffect::VerifyChallenge {
                flow_id, answer, ..
            } => {
                let outcome = self.provider.verify_challenge(&answer).await;
                SignInEvent::ChallengeVerified {
                    effect_id: ctx.effect_id,
                    flow_id,
                    outcome,
                }
            }

            SignInEffect::OpenHostedUi { flow_id, provider } => {
                let outcome = self.provider.open_hosted_ui(provider.as_deref()).await;
                SignInEvent::HostedUiOpened {
                    effect_id: ctx.effect_id,
                    flow_id,
                    outcome,
                }
            }

            SignInEffect::ExchangeAuthorizationCode { flow_id, code } => {
                let outcome = self.provider.exchange_code(&code).await;
                SignInEvent::CodeExchanged {
                    effect_id: ctx.effect_id,
                    flow_id,
                    outcome,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signin::state::{FlowId, SessionTokens};
    use crate::signin::transport::{
        ChallengeReply, Credentials, InitiateReply, TransportError,
    };

    struct OneUserProvider;

    #[async_trait]
    impl IdentityProvider for OneUserProvider {
        async fn initiate_auth(
            &self,
            credentials: &Credentials,
        ) -> Result<InitiateReply, TransportError> {
            if credentials.username == "alice" {
                Ok(InitiateReply::SignedIn(SessionTokens {
                    access_token: "access".into(),
                    id_token: None,
                    refresh_token: None,
                    expires_in_secs: 3600,
                }))
            } else {
                Err(TransportError::new("unknown user"))
            }
        }

        async fn verify_challenge(&self, _answer: &str) -> Result<ChallengeReply, TransportError> {
            Ok(ChallengeReply::Rejected {
                reason: "no challenge pending".into(),
            })
        }

        async fn open_hosted_ui(&self, _provider: Option<&str>) -> Result<(), TransportError> {
            Ok(())
        }

        async fn exchange_code(&self, _code: &str) -> Result<SessionTokens, TransportError> {
            Err(TransportError::new("bad code"))
        }
    }

    #[tokio::test]
    async fn initiate_effect_produces_correlated_completion() {
        let handler = SignInEffectHandler::new(OneUserProvider);
        let ctx = EffectContext::new();
        let flow_id = FlowId::new();

        let event = handler
            .handle(
                SignInEffect::CallInitiateAuth {
                    flow_id,
                    credentials: Credentials::new("alice", "pw"),
                },
                &ctx,
            )
            .await;

        match event {
            SignInEvent::AuthInitiated {
                effect_id,
                flow_id: event_flow,
                outcome,
            } => {
                assert_eq!(effect_id, ctx.effect_id);
                assert_eq!(event_flow, flow_id);
                assert!(matches!(outcome, Ok(InitiateReply::SignedIn(_))));
            }
            other => panic!("expected AuthInitiated, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn transport_failure_is_packaged_into_the_event() {
        let handler = SignInEffectHandler::new(OneUserProvider);
        let ctx = EffectContext::new();
        let flow_id = FlowId::new();

        let event = handler
            .handle(
                SignInEffect::CallInitiateAuth {
                    flow_id,
                    credentials: Credentials::new("mallory", "pw"),
                },
                &ctx,
            )
            .await;

        match event {
            SignInEvent::AuthInitiated { outcome, .. } => {
                assert_eq!(outcome, Err(TransportError::new("unknown user")));
            }
            other => panic!("expected AuthInitiated, got {:?}", other),
        }
    }
}
