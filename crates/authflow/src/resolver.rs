//! Pure transition logic: resolvers map a state/event pair to a resolution.

use crate::introspection::StateInfo;
use crate::timer::Timer;

/// A state value owned by a [`StateMachine`](crate::StateMachine).
///
/// States are immutable snapshots of a flow's progress; the engine produces
/// a new value on every transition and never mutates one in place.
pub trait MachineState: Clone + Send + Sync + 'static {
    /// Whether no further event can change this state without external
    /// re-initiation.
    fn is_terminal(&self) -> bool;

    /// Key-value description for logging and diagnostics.
    fn info(&self) -> StateInfo;
}

/// A stimulus applied to a state via the resolver.
///
/// Events are immutable and ordered only by arrival. An event that must be
/// matched to a previously dispatched effect carries that effect's
/// correlation identifier in its payload.
pub trait MachineEvent: Send + 'static {
    /// Stable label for logs and protocol-violation reports.
    fn kind(&self) -> &'static str;
}

/// Pure flow logic: `resolve` computes the next state and the effects to run.
///
/// Both methods must be deterministic with no side effects. All
/// non-determinism (network, time, randomness) lives in the effect executor;
/// a resolver given the same `(state, event)` pair always returns the same
/// resolution. Because the engine applies events one at a time, resolvers
/// never need locks.
///
/// # Example
///
/// ```ignore
/// impl Resolver for TurnstileResolver {
///     type State = TurnstileState;
///     type Event = TurnstileEvent;
///     type Effect = TurnstileEffect;
///
///     fn resolve(&self, state: &Self::State, event: &Self::Event)
///         -> Resolution<Self::State, Self::Effect, Self::Event>
///     {
///         match (state, event) {
///             (TurnstileState::Locked, TurnstileEvent::Coin) => {
///                 Transition::to(TurnstileState::Unlocked)
///                     .with_effect(TurnstileEffect::ReleaseLatch)
///                     .into()
///             }
///             (TurnstileState::Unlocked, TurnstileEvent::Coin) => Resolution::Stale,
///             _ => Resolution::Unexpected,
///         }
///     }
///
///     fn on_unexpected(&self, state: &Self::State, event: &Self::Event) -> Self::State {
///         TurnstileState::Jammed { event: event.kind() }
///     }
/// }
/// ```
pub trait Resolver: Send + Sync + 'static {
    /// The state type this resolver transitions.
    type State: MachineState;

    /// The stimuli this resolver understands.
    type Event: MachineEvent;

    /// Side-effect descriptions handed to the executor after a commit.
    type Effect: Send + 'static;

    /// Compute the resolution for an event against the current state.
    ///
    /// Every event is potentially late relative to the state it targets: an
    /// effect completion may arrive after cancellation has already moved the
    /// machine on. Resolvers distinguish such superseded stimuli
    /// ([`Resolution::Stale`]) from true protocol violations
    /// ([`Resolution::Unexpected`]).
    fn resolve(
        &self,
        state: &Self::State,
        event: &Self::Event,
    ) -> Resolution<Self::State, Self::Effect, Self::Event>;

    /// Build the error state committed when `resolve` returns
    /// [`Resolution::Unexpected`].
    fn on_unexpected(&self, state: &Self::State, event: &Self::Event) -> Self::State;
}

/// Outcome of resolving one event against one state.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<S, F, E> {
    /// Commit a transition, then run its effects and schedule its timers.
    Next(Transition<S, F, E>),

    /// The event is late relative to the current state (a superseded effect
    /// result, a duplicate call). Ignored without a transition; never
    /// surfaced to the caller.
    Stale,

    /// The event has no defined transition from this state. The engine
    /// commits the resolver's [`on_unexpected`](Resolver::on_unexpected)
    /// state so protocol violations stay observable.
    Unexpected,
}

/// A committed state change plus the asynchronous work it triggers.
///
/// Effects are descriptions, not executions; the executor interprets them
/// after the transition has committed. Timers deliver a follow-up event
/// through the ordinary queue after a delay.
///
/// # Example
///
/// ```ignore
/// Transition::to(SignInState::Initiating { flow_id, method })
///     .with_effect(SignInEffect::CallInitiateAuth { flow_id, credentials })
///     .with_timer_after(timeout, SignInEvent::TimedOut { flow_id })
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S, F, E> {
    next: S,
    effects: Vec<F>,
    timers: Vec<Timer<E>>,
}

impl<S, F, E> Transition<S, F, E> {
    /// Create a transition to the given state with no effects.
    pub fn to(next: S) -> Self {
        Self {
            next,
            effects: vec![],
            timers: vec![],
        }
    }

    /// Add an effect to run once this transition commits.
    pub fn with_effect(mut self, effect: F) -> Self {
        self.effects.push(effect);
        self
    }

    /// Add multiple effects to this transition.
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = F>) -> Self {
        self.effects.extend(effects);
        self
    }

    /// Schedule an event to be delivered after this transition commits.
    pub fn with_timer(mut self, timer: Timer<E>) -> Self {
        self.timers.push(timer);
        self
    }

    /// Schedule an event after a delay from now.
    ///
    /// Convenience for `with_timer(Timer::after(delay, event))`.
    pub fn with_timer_after(self, delay: std::time::Duration, event: E) -> Self {
        self.with_timer(Timer::after(delay, event))
    }

    /// Borrow the target state.
    pub fn next(&self) -> &S {
        &self.next
    }

    /// Borrow the effects produced by this transition.
    pub fn effects(&self) -> &[F] {
        &self.effects
    }

    /// Borrow the timers scheduled by this transition.
    pub fn timers(&self) -> &[Timer<E>] {
        &self.timers
    }

    /// Consume the transition into its parts.
    pub(crate) fn into_parts(self) -> (S, Vec<F>, Vec<Timer<E>>) {
        (self.next, self.effects, self.timers)
    }
}

impl<S, F, E> From<Transition<S, F, E>> for Resolution<S, F, E> {
    fn from(transition: Transition<S, F, E>) -> Self {
        Resolution::Next(transition)
    }
}
