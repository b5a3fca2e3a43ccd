//! Caller-facing cancellable operation around a sign-in flow.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::sync::watch;
use tracing::debug;

use crate::error::AuthError;
use crate::hub::{Hub, HubPayload};

use super::event::SignInEvent;
use super::helper::{FlowOutcome, HostedUiSignInHelper, PasswordSignInHelper, SignInMachine};
use super::state::FlowId;
use super::transport::Credentials;

/// Hub event names published on terminal transitions.
pub mod hub_events {
    /// A username/password flow finished.
    pub const SIGN_IN: &str = "auth.signIn";
    /// A hosted-UI flow finished.
    pub const HOSTED_UI_SIGN_IN: &str = "auth.hostedUiSignIn";
}

/// What the caller asked for.
#[derive(Debug, Clone)]
pub enum SignInRequest {
    /// Plain username/password sign-in.
    Password { credentials: Credentials },
    /// Browser-based hosted-UI sign-in.
    HostedUi { provider: Option<String> },
}

impl SignInRequest {
    fn hub_event(&self) -> &'static str {
        match self {
            SignInRequest::Password { .. } => hub_events::SIGN_IN,
            SignInRequest::HostedUi { .. } => hub_events::HOSTED_UI_SIGN_IN,
        }
    }
}

struct OperationInner {
    machine: SignInMachine,
    hub: Hub,
    hub_event: &'static str,
    /// Taken by whichever of `start`/`cancel` runs first.
    request: Mutex<Option<SignInRequest>>,
    /// Set once the initiating event has been sent.
    flow: Mutex<Option<FlowId>>,
    finished: Mutex<bool>,
    cancelled: AtomicBool,
    outcome: watch::Sender<Option<FlowOutcome>>,
}

impl OperationInner {
    /// Deliver the outcome and publish the hub event. Idempotent: a second
    /// cancellation or a duplicate terminal notification changes nothing.
    fn finish(&self, outcome: FlowOutcome) {
        {
            let mut finished = self.finished.lock().expect("operation finish lock poisoned");
            if *finished {
                return;
            }
            *finished = true;
        }

        let flow = *self.flow.lock().expect("operation flow lock poisoned");
        let data = match &outcome {
            Ok(_) => json!({
                "outcome": "signedIn",
                "flow_id": flow.map(|id| id.to_string()),
            }),
            Err(error) => json!({
                "outcome": "failed",
                "error": error.to_string(),
                "flow_id": flow.map(|id| id.to_string()),
            }),
        };

        debug!(event = self.hub_event, success = outcome.is_ok(), "operation finished");
        self.outcome.send_replace(Some(outcome));
        self.hub.publish(HubPayload::new(self.hub_event, data));
    }

    /// Finish, resolving a success that raced an observed cancellation as
    /// cancelled rather than signed in.
    fn finish_after_flow(&self, outcome: FlowOutcome) {
        let outcome = match outcome {
            Ok(_) if self.cancelled.load(Ordering::SeqCst) => Err(AuthError::Cancelled),
            other => other,
        };
        self.finish(outcome);
    }
}

/// Cancellable handle for one sign-in flow.
///
/// Create with [`new`](Self::new), then [`start`](Self::start). The
/// operation finishes exactly once — on the flow's terminal state, or
/// immediately if cancelled before the initiating event was ever sent.
#[derive(Clone)]
pub struct SignInOperation {
    inner: Arc<OperationInner>,
}

impl SignInOperation {
    /// Create an operation; nothing touches the machine until `start`.
    pub fn new(machine: SignInMachine, hub: Hub, request: SignInRequest) -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            inner: Arc::new(OperationInner {
                machine,
                hub,
                hub_event: request.hub_event(),
                request: Mutex::new(Some(request)),
                flow: Mutex::new(None),
                finished: Mutex::new(false),
                cancelled: AtomicBool::new(false),
                outcome,
            }),
        }
    }

    /// Begin the flow. Calling twice is a no-op.
    pub fn start(&self) {
        let Some(request) = self
            .inner
            .request
            .lock()
            .expect("operation request lock poisoned")
            .take()
        else {
            return;
        };

        if self.inner.cancelled.load(Ordering::SeqCst) {
            // Cancelled before the initiating event: finish without ever
            // touching the machine.
            self.inner.finish(Err(AuthError::Cancelled));
            return;
        }

        match request {
            SignInRequest::Password { credentials } => {
                let helper = PasswordSignInHelper::initiate(&self.inner.machine, credentials);
                self.track(helper.flow_id());
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    let outcome = helper.wait().await;
                    inner.finish_after_flow(outcome);
                });
            }
            SignInRequest::HostedUi { provider } => {
                let helper = HostedUiSignInHelper::initiate(&self.inner.machine, provider);
                self.track(helper.flow_id());
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    let outcome = helper.wait().await;
                    inner.finish_after_flow(outcome);
                });
            }
        }
    }

    /// Record the in-flight flow and close the cancel-during-start gap.
    fn track(&self, flow_id: FlowId) {
        *self.inner.flow.lock().expect("operation flow lock poisoned") = Some(flow_id);
        if self.inner.cancelled.load(Ordering::SeqCst) {
            self.inner.machine.send(SignInEvent::Cancel { flow_id });
        }
    }

    /// Request cancellation.
    ///
    /// Before `start`: the operation finishes immediately with a
    /// cancellation outcome and the machine is never touched. After: a
    /// `Cancel` event goes through the machine so in-flight effects are
    /// abandoned via the ordinary resolver path, and the operation finishes
    /// on the next terminal state. Idempotent.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        let not_started = self
            .inner
            .request
            .lock()
            .expect("operation request lock poisoned")
            .take()
            .is_some();
        if not_started {
            self.inner.finish(Err(AuthError::Cancelled));
            return;
        }

        if let Some(flow_id) = *self.inner.flow.lock().expect("operation flow lock poisoned") {
            self.inner.machine.send(SignInEvent::Cancel { flow_id });
        }
    }

    /// Submit an answer for the pending challenge.
    pub fn submit_challenge_answer(&self, answer: impl Into<String>) {
        if let Some(flow_id) = *self.inner.flow.lock().expect("operation flow lock poisoned") {
            self.inner.machine.send(SignInEvent::SubmitChallengeAnswer {
                flow_id,
                answer: answer.into(),
            });
        }
    }

    /// Deliver the authorization code from the hosted-UI redirect.
    pub fn complete_hosted_ui_redirect(&self, code: impl Into<String>) {
        if let Some(flow_id) = *self.inner.flow.lock().expect("operation flow lock poisoned") {
            self.inner
                .machine
                .send(SignInEvent::CompleteHostedUiRedirect {
                    flow_id,
                    code: code.into(),
                });
        }
    }

    /// The flow this operation is driving, once started.
    pub fn flow_id(&self) -> Option<FlowId> {
        *self.inner.flow.lock().expect("operation flow lock poisoned")
    }

    /// Whether the operation has delivered its outcome.
    pub fn is_finished(&self) -> bool {
        *self
            .inner
            .finished
            .lock()
            .expect("operation finish lock poisoned")
    }

    /// Wait for the operation's single outcome.
    ///
    /// May be awaited by any number of callers; all observe the same value.
    pub async fn outcome(&self) -> FlowOutcome {
        let mut rx = self.inner.outcome.subscribe();
        loop {
            if let Some(outcome) = rx.borrow_and_update().clone() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                return Err(AuthError::Cancelled);
            }
        }
    }
}
