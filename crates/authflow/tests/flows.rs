//! End-to-end tests for the sign-in flow family.
//!
//! Time is paused in every test, so provider delays and flow timeouts are
//! deterministic: events race exactly as the test scripts them.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use authflow::signin::{
    self, ChallengeDetails, ChallengeKind, ChallengeReply, Credentials, FlowId, HostedUiSignInHelper,
    IdentityProvider, InitiateReply, PasswordSignInHelper, SessionTokens, SignInEvent,
    SignInMachine, SignInOperation, SignInRequest, SignInState, TransportError, hub_events,
};
use authflow::{AuthError, FlowConfig, Hub, HubPayload, MachineState};

fn tokens() -> SessionTokens {
    SessionTokens {
        access_token: "access".into(),
        id_token: Some("identity".into()),
        refresh_token: Some("refresh".into()),
        expires_in_secs: 3600,
    }
}

fn sms_challenge() -> ChallengeDetails {
    ChallengeDetails {
        kind: ChallengeKind::SmsCode,
        destination: Some("+***-**34".into()),
    }
}

/// Scriptable provider: per-call delays, an optional challenge round, and
/// an optional initiate failure.
struct FakeProvider {
    challenge: Option<ChallengeDetails>,
    expected_answer: String,
    fail_initiate: Option<TransportError>,
    initiate_delay: Duration,
    verify_delay: Duration,
    open_delay: Duration,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            challenge: None,
            expected_answer: "123456".into(),
            fail_initiate: None,
            initiate_delay: Duration::ZERO,
            verify_delay: Duration::ZERO,
            open_delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn initiate_auth(
        &self,
        _credentials: &Credentials,
    ) -> Result<InitiateReply, TransportError> {
        tokio::time::sleep(self.initiate_delay).await;
        if let Some(error) = &self.fail_initiate {
            return Err(error.clone());
        }
        match &self.challenge {
            Some(challenge) => Ok(InitiateReply::ChallengeRequired(challenge.clone())),
            None => Ok(InitiateReply::SignedIn(tokens())),
        }
    }

    async fn verify_challenge(&self, answer: &str) -> Result<ChallengeReply, TransportError> {
        tokio::time::sleep(self.verify_delay).await;
        if answer == self.expected_answer {
            Ok(ChallengeReply::Accepted(tokens()))
        } else {
            Ok(ChallengeReply::Rejected {
                reason: "code mismatch".into(),
            })
        }
    }

    async fn open_hosted_ui(&self, _provider: Option<&str>) -> Result<(), TransportError> {
        tokio::time::sleep(self.open_delay).await;
        Ok(())
    }

    async fn exchange_code(&self, code: &str) -> Result<SessionTokens, TransportError> {
        if code == "good-code" {
            Ok(tokens())
        } else {
            Err(TransportError::new("invalid authorization code"))
        }
    }
}

fn started_machine(provider: FakeProvider) -> SignInMachine {
    let machine = signin::sign_in_machine(FlowConfig::default(), provider);
    machine.start();
    machine
}

/// Record every committed transition's status label, in commit order.
fn record_states(machine: &SignInMachine) -> Arc<Mutex<Vec<String>>> {
    let states = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&states);
    machine.subscribe(move |_, new| {
        record.lock().expect("lock").push(new.info().status);
    });
    states
}

/// Record every hub payload the machine's operations publish.
fn record_hub(hub: &Hub) -> Arc<Mutex<Vec<HubPayload>>> {
    let payloads = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&payloads);
    hub.subscribe(move |payload| {
        record.lock().expect("lock").push(payload.clone());
    });
    payloads
}

async fn wait_for(machine: &SignInMachine, predicate: impl Fn(&SignInState) -> bool) -> SignInState {
    tokio::time::timeout(Duration::from_secs(600), async {
        loop {
            let state = machine.current_state();
            if predicate(&state) {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("machine did not reach expected state")
}

#[tokio::test(start_paused = true)]
async fn password_sign_in_transitions_to_signed_in() {
    let machine = started_machine(FakeProvider::default());
    let states = record_states(&machine);

    let helper = PasswordSignInHelper::initiate(&machine, Credentials::new("alice", "hunter2"));
    let outcome = helper.wait().await;

    assert_eq!(outcome, Ok(tokens()));
    // Notification order equals commit order: exactly these transitions,
    // no gaps, no duplicates.
    assert_eq!(*states.lock().expect("lock"), vec!["initiating", "signedIn"]);
}

#[tokio::test(start_paused = true)]
async fn challenge_flow_retries_wrong_code_then_succeeds() {
    let machine = started_machine(FakeProvider {
        challenge: Some(sms_challenge()),
        ..Default::default()
    });

    let helper = PasswordSignInHelper::initiate(&machine, Credentials::new("alice", "hunter2"));
    wait_for(&machine, |state| {
        matches!(
            state,
            SignInState::AwaitingChallenge {
                verifying: false,
                ..
            }
        )
    })
    .await;

    helper.submit_challenge_answer("000000");
    wait_for(&machine, |state| {
        matches!(
            state,
            SignInState::AwaitingChallenge {
                attempts: 1,
                verifying: false,
                ..
            }
        )
    })
    .await;

    helper.submit_challenge_answer("123456");
    let outcome = helper.wait().await;

    assert_eq!(outcome, Ok(tokens()));
}

#[tokio::test(start_paused = true)]
async fn wrong_codes_exhaust_the_attempt_limit() {
    let machine = started_machine(FakeProvider {
        challenge: Some(sms_challenge()),
        ..Default::default()
    });

    let helper = PasswordSignInHelper::initiate(&machine, Credentials::new("alice", "hunter2"));
    for attempt in 0..3u32 {
        wait_for(&machine, |state| {
            matches!(
                state,
                SignInState::AwaitingChallenge { attempts, verifying: false, .. }
                    if *attempts == attempt
            )
        })
        .await;
        helper.submit_challenge_answer("000000");
    }

    let outcome = helper.wait().await;

    assert_eq!(
        outcome,
        Err(AuthError::ChallengeAttemptsExceeded { attempts: 3 })
    );
}

#[tokio::test(start_paused = true)]
async fn hosted_ui_flow_completes_through_redirect_and_exchange() {
    let machine = started_machine(FakeProvider::default());

    let helper = HostedUiSignInHelper::initiate(&machine, Some("acme".into()));
    wait_for(&machine, |state| {
        matches!(
            state,
            SignInState::ResolvingHostedUi {
                exchanging: false,
                ..
            }
        )
    })
    .await;

    helper.complete_redirect("good-code");
    let outcome = helper.wait().await;

    assert_eq!(outcome, Ok(tokens()));
}

#[tokio::test(start_paused = true)]
async fn hosted_ui_cancel_before_redirect_beats_late_success() {
    let machine = started_machine(FakeProvider {
        open_delay: Duration::from_millis(50),
        ..Default::default()
    });
    let hub = Hub::default();
    let payloads = record_hub(&hub);

    let operation = SignInOperation::new(
        machine.clone(),
        hub,
        SignInRequest::HostedUi { provider: None },
    );
    operation.start();
    operation.cancel();

    let outcome = operation.outcome().await;
    assert_eq!(outcome, Err(AuthError::Cancelled));

    // Let the delayed open-hosted-ui effect complete: its result is stale
    // and must not revive the flow.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(matches!(
        machine.current_state(),
        SignInState::Cancelled { .. }
    ));
    assert_eq!(operation.outcome().await, Err(AuthError::Cancelled));

    let payloads = payloads.lock().expect("lock");
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].event_name, hub_events::HOSTED_UI_SIGN_IN);
    assert_eq!(payloads[0].data["outcome"], "failed");
}

#[tokio::test(start_paused = true)]
async fn cancel_before_start_never_touches_the_machine() {
    let machine = started_machine(FakeProvider::default());
    let states = record_states(&machine);
    let hub = Hub::default();
    let payloads = record_hub(&hub);

    let operation = SignInOperation::new(
        machine.clone(),
        hub,
        SignInRequest::Password {
            credentials: Credentials::new("alice", "hunter2"),
        },
    );
    operation.cancel();
    operation.start();

    assert_eq!(operation.outcome().await, Err(AuthError::Cancelled));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(machine.current_state(), SignInState::NotStarted);
    assert!(states.lock().expect("lock").is_empty());
    assert_eq!(payloads.lock().expect("lock").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_is_idempotent_after_success() {
    let machine = started_machine(FakeProvider::default());
    let hub = Hub::default();
    let payloads = record_hub(&hub);

    let operation = SignInOperation::new(
        machine.clone(),
        hub,
        SignInRequest::Password {
            credentials: Credentials::new("alice", "hunter2"),
        },
    );
    operation.start();

    assert_eq!(operation.outcome().await, Ok(tokens()));

    operation.cancel();
    operation.cancel();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // No additional outcome, no additional hub event, and the machine's
    // terminal state is untouched by the late cancellation.
    assert_eq!(operation.outcome().await, Ok(tokens()));
    assert_eq!(payloads.lock().expect("lock").len(), 1);
    assert!(matches!(
        machine.current_state(),
        SignInState::SignedIn { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn cancel_while_initiate_is_outstanding_wins_the_race() {
    let machine = started_machine(FakeProvider {
        initiate_delay: Duration::from_millis(20),
        ..Default::default()
    });
    let hub = Hub::default();
    let payloads = record_hub(&hub);

    let operation = SignInOperation::new(
        machine.clone(),
        hub,
        SignInRequest::Password {
            credentials: Credentials::new("alice", "hunter2"),
        },
    );
    operation.start();
    operation.cancel();

    assert_eq!(operation.outcome().await, Err(AuthError::Cancelled));

    // The racing success arrives later and is discarded as stale; the
    // completion has already fired exactly once.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(matches!(
        machine.current_state(),
        SignInState::Cancelled { .. }
    ));
    assert_eq!(payloads.lock().expect("lock").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stale_verification_does_not_revive_a_cancelled_flow() {
    let machine = started_machine(FakeProvider {
        challenge: Some(sms_challenge()),
        verify_delay: Duration::from_secs(10),
        ..Default::default()
    });

    let helper = PasswordSignInHelper::initiate(&machine, Credentials::new("alice", "hunter2"));
    wait_for(&machine, |state| {
        matches!(state, SignInState::AwaitingChallenge { .. })
    })
    .await;

    // The correct answer is in flight when the cancellation arrives.
    helper.submit_challenge_answer("123456");
    helper.cancel();

    assert_eq!(helper.wait().await, Err(AuthError::Cancelled));

    // The verification eventually reports success against the cancelled
    // flow and is discarded.
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(matches!(
        machine.current_state(),
        SignInState::Cancelled { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn unexpected_event_fails_observably_and_machine_recovers() {
    let machine = started_machine(FakeProvider::default());

    machine.send(SignInEvent::SubmitChallengeAnswer {
        flow_id: FlowId::new(),
        answer: "123456".into(),
    });

    let state = wait_for(&machine, |state| state.is_terminal()).await;
    assert!(matches!(
        state,
        SignInState::Error {
            flow_id: None,
            error: AuthError::ProtocolViolation { .. },
        }
    ));

    // The protocol violation is terminal for the (nonexistent) flow, not
    // fatal for the machine: a fresh flow still completes.
    let helper = PasswordSignInHelper::initiate(&machine, Credentials::new("alice", "hunter2"));
    assert_eq!(helper.wait().await, Ok(tokens()));
}

#[tokio::test(start_paused = true)]
async fn unresponsive_provider_times_the_flow_out() {
    let machine = signin::sign_in_machine(
        FlowConfig {
            sign_in_timeout: Duration::from_secs(1),
            ..Default::default()
        },
        FakeProvider {
            initiate_delay: Duration::from_secs(3600),
            ..Default::default()
        },
    );
    machine.start();

    let helper = PasswordSignInHelper::initiate(&machine, Credentials::new("alice", "hunter2"));
    assert_eq!(helper.wait().await, Err(AuthError::FlowTimedOut));

    // The eventual provider reply resolves against the error state and is
    // discarded.
    tokio::time::sleep(Duration::from_secs(7200)).await;
    assert!(matches!(
        machine.current_state(),
        SignInState::Error {
            error: AuthError::FlowTimedOut,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn one_machine_drives_consecutive_flows() {
    let machine = started_machine(FakeProvider::default());

    let first = PasswordSignInHelper::initiate(&machine, Credentials::new("alice", "hunter2"));
    assert_eq!(first.wait().await, Ok(tokens()));

    // The machine persists past a terminal state; the next flow
    // re-initiates from it with a fresh correlation.
    let second = HostedUiSignInHelper::initiate(&machine, None);
    wait_for(&machine, |state| {
        matches!(
            state,
            SignInState::ResolvingHostedUi {
                exchanging: false,
                ..
            }
        )
    })
    .await;
    second.complete_redirect("good-code");

    assert_eq!(second.wait().await, Ok(tokens()));
}

#[tokio::test(start_paused = true)]
async fn failed_code_exchange_fails_the_flow() {
    let machine = started_machine(FakeProvider::default());

    let helper = HostedUiSignInHelper::initiate(&machine, None);
    wait_for(&machine, |state| {
        matches!(
            state,
            SignInState::ResolvingHostedUi {
                exchanging: false,
                ..
            }
        )
    })
    .await;
    helper.complete_redirect("bad-code");

    assert_eq!(
        helper.wait().await,
        Err(AuthError::transport("invalid authorization code"))
    );
}

#[tokio::test(start_paused = true)]
async fn operation_drives_challenge_round_trips() {
    let machine = started_machine(FakeProvider {
        challenge: Some(sms_challenge()),
        ..Default::default()
    });
    let hub = Hub::default();
    let payloads = record_hub(&hub);

    let operation = SignInOperation::new(
        machine.clone(),
        hub,
        SignInRequest::Password {
            credentials: Credentials::new("alice", "hunter2"),
        },
    );
    operation.start();
    wait_for(&machine, |state| {
        matches!(
            state,
            SignInState::AwaitingChallenge {
                verifying: false,
                ..
            }
        )
    })
    .await;
    operation.submit_challenge_answer("123456");

    assert_eq!(operation.outcome().await, Ok(tokens()));

    let payloads = payloads.lock().expect("lock");
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].event_name, hub_events::SIGN_IN);
    assert_eq!(payloads[0].data["outcome"], "signedIn");
}
