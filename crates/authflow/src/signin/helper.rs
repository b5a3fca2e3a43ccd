//! Per-flow orchestrators bridging caller requests to machine events.
//!
//! A helper translates one external request into the machine's event
//! vocabulary and surfaces exactly one terminal outcome. It subscribes
//! before sending the initiating event, reacts only to terminal states
//! carrying its own flow id, and removes its subscription when it resolves
//! or is dropped.

use std::sync::Mutex;

use tokio::sync::oneshot;
use tracing::debug;

use crate::error::AuthError;
use crate::machine::{ListenerToken, StateMachine};

use super::event::SignInEvent;
use super::resolver::SignInResolver;
use super::state::{FlowId, SessionTokens, SignInState};
use super::transport::Credentials;

/// A machine driving the sign-in flow family.
pub type SignInMachine = StateMachine<SignInResolver>;

/// Outcome of one flow: tokens on success, a typed failure otherwise.
pub type FlowOutcome = Result<SessionTokens, AuthError>;

/// Subscription that resolves a oneshot on the first matching terminal
/// state.
struct TerminalWatch {
    token: ListenerToken,
    outcome: oneshot::Receiver<FlowOutcome>,
}

/// Subscribe for the terminal state of `flow_id`.
///
/// The sender is taken on first fire, so the completion resolves exactly
/// once even if further terminal transitions occur; terminal states of
/// unrelated flows are ignored.
fn watch_terminal(machine: &SignInMachine, flow_id: FlowId) -> TerminalWatch {
    let (tx, rx) = oneshot::channel();
    let slot = Mutex::new(Some(tx));
    let token = machine.subscribe(move |_old, new| {
        if new.flow_id() != Some(flow_id) {
            return;
        }
        let outcome = match new {
            SignInState::SignedIn { session, .. } => Ok(session.clone()),
            SignInState::Cancelled { .. } => Err(AuthError::Cancelled),
            SignInState::Error { error, .. } => Err(error.clone()),
            _ => return,
        };
        if let Some(tx) = slot.lock().expect("terminal watch lock poisoned").take() {
            let _ = tx.send(outcome);
        }
    });
    TerminalWatch {
        token,
        outcome: rx,
    }
}

async fn wait_for_outcome(
    machine: &SignInMachine,
    flow_id: FlowId,
    watch: &mut TerminalWatch,
) -> FlowOutcome {
    let outcome = match (&mut watch.outcome).await {
        Ok(outcome) => outcome,
        // The machine shut down mid-flow; treat the host teardown as a
        // cancellation.
        Err(_) => Err(AuthError::Cancelled),
    };
    machine.unsubscribe(watch.token);
    debug!(flow_id = %flow_id, success = outcome.is_ok(), "flow resolved");
    outcome
}

/// Orchestrates a username/password flow, including any challenge round
/// trips the provider requires.
pub struct PasswordSignInHelper {
    flow_id: FlowId,
    machine: SignInMachine,
    watch: TerminalWatch,
}

impl PasswordSignInHelper {
    /// Subscribe to the machine and send the initiating event.
    pub fn initiate(machine: &SignInMachine, credentials: Credentials) -> Self {
        let flow_id = FlowId::new();
        let watch = watch_terminal(machine, flow_id);
        machine.send(SignInEvent::InitiatePasswordSignIn {
            flow_id,
            credentials,
        });
        Self {
            flow_id,
            machine: machine.clone(),
            watch,
        }
    }

    /// The flow this helper is driving.
    pub fn flow_id(&self) -> FlowId {
        self.flow_id
    }

    /// Submit an answer for the pending challenge.
    pub fn submit_challenge_answer(&self, answer: impl Into<String>) {
        self.machine.send(SignInEvent::SubmitChallengeAnswer {
            flow_id: self.flow_id,
            answer: answer.into(),
        });
    }

    /// Request cancellation of this flow.
    pub fn cancel(&self) {
        self.machine.send(SignInEvent::Cancel {
            flow_id: self.flow_id,
        });
    }

    /// Resolve to the flow's single terminal outcome.
    pub async fn wait(mut self) -> FlowOutcome {
        let Self {
            flow_id,
            machine,
            watch,
        } = &mut self;
        wait_for_outcome(machine, *flow_id, watch).await
    }
}

impl Drop for PasswordSignInHelper {
    fn drop(&mut self) {
        self.machine.unsubscribe(self.watch.token);
    }
}

/// Orchestrates a hosted-UI flow: open the browser session, wait for the
/// redirect, exchange the code.
pub struct HostedUiSignInHelper {
    flow_id: FlowId,
    machine: SignInMachine,
    watch: TerminalWatch,
}

impl HostedUiSignInHelper {
    /// Subscribe to the machine and send the initiating event.
    pub fn initiate(machine: &SignInMachine, provider: Option<String>) -> Self {
        let flow_id = FlowId::new();
        let watch = watch_terminal(machine, flow_id);
        machine.send(SignInEvent::InitiateHostedUiSignIn { flow_id, provider });
        Self {
            flow_id,
            machine: machine.clone(),
            watch,
        }
    }

    /// The flow this helper is driving.
    pub fn flow_id(&self) -> FlowId {
        self.flow_id
    }

    /// Deliver the authorization code from the redirect back into the flow.
    pub fn complete_redirect(&self, code: impl Into<String>) {
        self.machine.send(SignInEvent::CompleteHostedUiRedirect {
            flow_id: self.flow_id,
            code: code.into(),
        });
    }

    /// Request cancellation of this flow.
    pub fn cancel(&self) {
        self.machine.send(SignInEvent::Cancel {
            flow_id: self.flow_id,
        });
    }

    /// Resolve to the flow's single terminal outcome.
    pub async fn wait(mut self) -> FlowOutcome {
        let Self {
            flow_id,
            machine,
            watch,
        } = &mut self;
        wait_for_outcome(machine, *flow_id, watch).await
    }
}

impl Drop for HostedUiSignInHelper {
    fn drop(&mut self) {
        self.machine.unsubscribe(self.watch.token);
    }
}
