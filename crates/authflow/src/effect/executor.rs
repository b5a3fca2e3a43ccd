//! Executor that runs effects and timers on independent tasks.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::context::EffectContext;
use super::handler::EffectHandler;
use crate::timer::Timer;

/// Runs effect descriptions and feeds their completions back to the machine.
///
/// Each dispatched effect gets its own task, so effects from the same or
/// different transitions run concurrently; the events they produce are
/// serialized again by the machine's queue. The executor holds only a weak
/// sender — once every machine handle is gone, completions are dropped with
/// a debug log instead of keeping the queue alive.
pub(crate) struct EffectExecutor<F, E> {
    handler: Option<Arc<dyn EffectHandler<F, E>>>,
    completions: mpsc::WeakUnboundedSender<E>,
}

impl<F, E> EffectExecutor<F, E>
where
    F: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn new(
        handler: Option<Arc<dyn EffectHandler<F, E>>>,
        completions: mpsc::WeakUnboundedSender<E>,
    ) -> Self {
        Self {
            handler,
            completions,
        }
    }

    /// Run one effect on its own task.
    ///
    /// At most one completion event is delivered per dispatch: the handler
    /// is invoked once and its event is sent once.
    pub(crate) fn dispatch(&self, effect: F) {
        let Some(handler) = &self.handler else {
            warn!("no effect handler registered; dropping effect");
            return;
        };

        let ctx = EffectContext::new();
        debug!(effect_id = %ctx.effect_id, "dispatching effect");

        let handler = Arc::clone(handler);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let event = handler.handle(effect, &ctx).await;
            deliver(&completions, event, &ctx);
        });
    }

    /// Deliver an event after a delay, through the ordinary queue.
    pub(crate) fn schedule(&self, timer: Timer<E>) {
        let completions = self.completions.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timer.delay).await;
            let Some(tx) = completions.upgrade() else {
                debug!("machine stopped; dropping scheduled event");
                return;
            };
            if tx.send(timer.event).is_err() {
                debug!("machine stopped; dropping scheduled event");
            }
        });
    }
}

fn deliver<E>(completions: &mpsc::WeakUnboundedSender<E>, event: E, ctx: &EffectContext) {
    let Some(tx) = completions.upgrade() else {
        debug!(effect_id = %ctx.effect_id, "machine stopped; dropping effect completion");
        return;
    };
    if tx.send(event).is_err() {
        debug!(effect_id = %ctx.effect_id, "machine stopped; dropping effect completion");
    } else {
        debug!(effect_id = %ctx.effect_id, "effect completion enqueued");
    }
}
