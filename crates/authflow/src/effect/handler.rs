//! Effect handler trait for executing flow side effects.

use async_trait::async_trait;

use super::context::EffectContext;

/// Handler for executing effects of type `F` into follow-up events of
/// type `E`.
///
/// Implement this once per flow family. The handler owns the non-pure half
/// of the system: network calls, external redirects, anything the resolver
/// merely described. Each invocation produces exactly one follow-up event —
/// failures are not thrown, they are packaged into the event's payload so
/// the resolver can decide whether they are terminal or retry-eligible.
///
/// # Example
///
/// ```ignore
/// #[async_trait]
/// impl<P: IdentityProvider> EffectHandler<SignInEffect, SignInEvent> for SignInEffectHandler<P> {
///     async fn handle(&self, effect: SignInEffect, ctx: &EffectContext) -> SignInEvent {
///         match effect {
///             SignInEffect::CallInitiateAuth { flow_id, credentials } => {
///                 let outcome = self.provider.initiate_auth(&credentials).await;
///                 SignInEvent::AuthInitiated { effect_id: ctx.effect_id, flow_id, outcome }
///             }
///             // ...
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait EffectHandler<F, E>: Send + Sync + 'static {
    /// Execute one effect and produce its single follow-up event.
    ///
    /// The executor delivers the returned event through the machine's queue;
    /// by the time it is applied, the flow may already have moved on, so the
    /// resolver treats it as potentially late.
    async fn handle(&self, effect: F, ctx: &EffectContext) -> E;
}
