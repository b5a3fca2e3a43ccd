//! Effect execution context with correlation metadata.

use time::OffsetDateTime;
use uuid::Uuid;

/// Correlation identifier for one dispatched effect.
///
/// Completion events carry the id of the effect that produced them, so
/// stale results can be traced back to the dispatch they answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId(Uuid);

impl EffectId {
    /// Create a fresh effect id (UUID v7, time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EffectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Context provided to effect handlers during execution.
///
/// Handlers copy [`effect_id`](Self::effect_id) into the completion event
/// they build, which lets the resolver and the logs tie a result back to
/// its dispatch.
#[derive(Debug, Clone)]
pub struct EffectContext {
    /// Unique identifier for this effect instance.
    pub effect_id: EffectId,

    /// When this effect was handed to the executor.
    pub dispatched_at: OffsetDateTime,
}

impl EffectContext {
    /// Create a context for a freshly dispatched effect.
    pub fn new() -> Self {
        Self {
            effect_id: EffectId::new(),
            dispatched_at: OffsetDateTime::now_utc(),
        }
    }
}

impl Default for EffectContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_ids_are_unique() {
        assert_ne!(EffectId::new(), EffectId::new());
    }

    #[test]
    fn context_carries_fresh_id() {
        let a = EffectContext::new();
        let b = EffectContext::new();

        assert_ne!(a.effect_id, b.effect_id);
        assert!(a.dispatched_at <= b.dispatched_at);
    }
}
