//! The sign-in flow family: states, events, effects, and orchestration for
//! username/password, hosted-UI, and challenge/response sign-in.
//!
//! One machine drives one flow at a time and persists for the owning
//! session; consecutive flows are kept apart by the [`FlowId`] correlation
//! carried in every state and event.

mod effect;
mod event;
mod handler;
mod helper;
mod operation;
mod resolver;
mod state;
mod transport;

pub use effect::SignInEffect;
pub use event::SignInEvent;
pub use handler::SignInEffectHandler;
pub use helper::{FlowOutcome, HostedUiSignInHelper, PasswordSignInHelper, SignInMachine};
pub use operation::{SignInOperation, SignInRequest, hub_events};
pub use resolver::SignInResolver;
pub use state::{
    ChallengeDetails, ChallengeKind, FlowId, SessionTokens, SignInMethod, SignInState,
};
pub use transport::{
    ChallengeReply, Credentials, IdentityProvider, InitiateReply, TransportError,
};

use crate::config::FlowConfig;
use crate::machine::StateMachine;

/// Assemble a machine wired for the sign-in flow family.
pub fn sign_in_machine<P: IdentityProvider>(config: FlowConfig, provider: P) -> SignInMachine {
    StateMachine::builder(SignInResolver::new(config), SignInState::NotStarted)
        .handler(SignInEffectHandler::new(provider))
        .build()
}
