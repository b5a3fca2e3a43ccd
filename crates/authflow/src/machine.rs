//! Serialized state machine engine.
//!
//! The engine owns exactly one current state, a FIFO event queue, and a set
//! of listeners. A single spawned loop applies events strictly in enqueue
//! order, so resolvers run without locks and transitions are totally
//! ordered. Effects produced by a transition execute concurrently on their
//! own tasks; the events they produce re-enter through [`StateMachine::send`]
//! and are serialized like every other stimulus — which is what lets a
//! cancellation be observed while an effect from an earlier transition is
//! still outstanding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::effect::{EffectExecutor, EffectHandler};
use crate::resolver::{MachineEvent, MachineState, Resolution, Resolver};

/// Identifies a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(Uuid);

type Listener<S> = Arc<dyn Fn(&S, &S) + Send + Sync>;

struct Shared<R: Resolver> {
    resolver: R,
    current: RwLock<R::State>,
    listeners: Mutex<Vec<(ListenerToken, Listener<R::State>)>>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<R::Event>>>,
    handler: Option<Arc<dyn EffectHandler<R::Effect, R::Event>>>,
    shutdown: watch::Sender<bool>,
    started: AtomicBool,
}

/// Handle to a running (or startable) state machine.
///
/// Handles are cheap to clone and share; the machine lives for the duration
/// of the owning session and is never destroyed mid-flow — flows complete or
/// are cancelled, and the machine persists for the next one. The serial loop
/// ends when [`shutdown`](Self::shutdown) is called or every handle has been
/// dropped.
pub struct StateMachine<R: Resolver> {
    shared: Arc<Shared<R>>,
    events_tx: mpsc::UnboundedSender<R::Event>,
}

impl<R: Resolver> Clone for StateMachine<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            events_tx: self.events_tx.clone(),
        }
    }
}

impl<R: Resolver> StateMachine<R> {
    /// Start building a machine with the given resolver and initial state.
    pub fn builder(resolver: R, initial: R::State) -> StateMachineBuilder<R> {
        StateMachineBuilder {
            resolver,
            initial,
            handler: None,
        }
    }

    /// Establish the initial state and spawn the transition loop.
    ///
    /// Idempotent: calling twice leaves the current state unchanged and
    /// returns the existing snapshot. Events sent before `start` are queued
    /// and applied once the loop is running.
    pub fn start(&self) -> R::State {
        if self.shared.started.swap(true, Ordering::SeqCst) {
            return self.current_state();
        }

        let rx = self
            .shared
            .events_rx
            .lock()
            .expect("event receiver lock poisoned")
            .take()
            .expect("event receiver consumed only by first start");
        let shared = Arc::clone(&self.shared);
        let completions = self.events_tx.downgrade();
        let shutdown = self.shared.shutdown.subscribe();

        tokio::spawn(run_loop(shared, rx, completions, shutdown));

        let snapshot = self.current_state();
        info!(state = %snapshot.info().status, "state machine started");
        snapshot
    }

    /// Enqueue an event without blocking.
    ///
    /// Events are applied to the resolver strictly in enqueue order; no
    /// event is applied concurrently with another. Events sent after
    /// shutdown are dropped with a warning.
    pub fn send(&self, event: R::Event) {
        let kind = event.kind();
        if self.events_tx.send(event).is_err() {
            warn!(event = kind, "state machine stopped; event dropped");
        }
    }

    /// Return an immutable snapshot of the current state.
    ///
    /// Always reflects the last committed transition, never a half-applied
    /// one.
    pub fn current_state(&self) -> R::State {
        self.shared
            .current
            .read()
            .expect("state lock poisoned")
            .clone()
    }

    /// Register a listener notified with `(old, new)` on every committed
    /// transition.
    ///
    /// Registration is effective from the next transition onward: a listener
    /// added during dispatch of the current transition does not receive that
    /// transition's notification. Listeners may unsubscribe themselves (or
    /// others) from inside their own notification.
    pub fn subscribe(
        &self,
        listener: impl Fn(&R::State, &R::State) + Send + Sync + 'static,
    ) -> ListenerToken {
        let token = ListenerToken(Uuid::new_v4());
        self.shared
            .listeners
            .lock()
            .expect("listener set lock poisoned")
            .push((token, Arc::new(listener)));
        token
    }

    /// Remove a listener; unknown tokens are ignored.
    pub fn unsubscribe(&self, token: ListenerToken) {
        self.shared
            .listeners
            .lock()
            .expect("listener set lock poisoned")
            .retain(|(t, _)| *t != token);
    }

    /// Stop the transition loop.
    ///
    /// Queued events that have not yet been applied are dropped; outstanding
    /// effect completions are discarded when they try to re-enter.
    pub fn shutdown(&self) {
        let _ = self.shared.shutdown.send(true);
    }
}

/// Builder for a [`StateMachine`].
pub struct StateMachineBuilder<R: Resolver> {
    resolver: R,
    initial: R::State,
    handler: Option<Arc<dyn EffectHandler<R::Effect, R::Event>>>,
}

impl<R: Resolver> StateMachineBuilder<R> {
    /// Register the handler that executes this machine's effects.
    ///
    /// Without a handler, effects are dropped with a warning — useful only
    /// for resolvers that never produce any.
    pub fn handler(mut self, handler: impl EffectHandler<R::Effect, R::Event>) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Build the machine. The transition loop starts on
    /// [`StateMachine::start`].
    pub fn build(self) -> StateMachine<R> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);

        StateMachine {
            shared: Arc::new(Shared {
                resolver: self.resolver,
                current: RwLock::new(self.initial),
                listeners: Mutex::new(Vec::new()),
                events_rx: Mutex::new(Some(events_rx)),
                handler: self.handler,
                shutdown,
                started: AtomicBool::new(false),
            }),
            events_tx,
        }
    }
}

/// Serial transition loop: exactly one transition is in progress at any
/// instant.
async fn run_loop<R: Resolver>(
    shared: Arc<Shared<R>>,
    mut events: mpsc::UnboundedReceiver<R::Event>,
    completions: mpsc::WeakUnboundedSender<R::Event>,
    mut shutdown: watch::Receiver<bool>,
) {
    let executor = EffectExecutor::new(shared.handler.clone(), completions);

    if *shutdown.borrow() {
        return;
    }

    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                match maybe_event {
                    Some(event) => apply(&shared, &executor, event),
                    None => {
                        debug!("all machine handles dropped; transition loop exiting");
                        break;
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("state machine shutting down");
                    break;
                }
            }
        }
    }
}

/// Apply one event: resolve, commit, notify, then hand effects off.
fn apply<R: Resolver>(
    shared: &Arc<Shared<R>>,
    executor: &EffectExecutor<R::Effect, R::Event>,
    event: R::Event,
) {
    let current = shared
        .current
        .read()
        .expect("state lock poisoned")
        .clone();

    match shared.resolver.resolve(&current, &event) {
        Resolution::Next(transition) => {
            let (next, effects, timers) = transition.into_parts();
            commit_and_notify(shared, &current, next);
            for timer in timers {
                executor.schedule(timer);
            }
            for effect in effects {
                executor.dispatch(effect);
            }
        }
        Resolution::Stale => {
            debug!(
                event = event.kind(),
                state = %current.info().status,
                "stale event ignored"
            );
        }
        Resolution::Unexpected => {
            warn!(
                event = event.kind(),
                state = %current.info().status,
                "unexpected event; failing flow"
            );
            let next = shared.resolver.on_unexpected(&current, &event);
            commit_and_notify(shared, &current, next);
        }
    }
}

/// Commit the next state, then notify listeners synchronously in
/// registration order.
///
/// The state is committed before any effect begins running, so listeners
/// and snapshot readers always observe committed values. The listener set
/// is snapshotted per dispatch: additions during notification take effect
/// from the next transition, and removals from inside a notification are
/// safe because the lock is not held while callbacks run.
fn commit_and_notify<R: Resolver>(shared: &Arc<Shared<R>>, old: &R::State, next: R::State) {
    *shared.current.write().expect("state lock poisoned") = next.clone();
    debug!(
        from = %old.info().status,
        to = %next.info().status,
        "transition committed"
    );

    let snapshot: Vec<Listener<R::State>> = shared
        .listeners
        .lock()
        .expect("listener set lock poisoned")
        .iter()
        .map(|(_, listener)| Arc::clone(listener))
        .collect();
    for listener in snapshot {
        listener(old, &next);
    }
}
