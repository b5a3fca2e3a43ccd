//! Effect execution: descriptions in, follow-up events out.
//!
//! Effects are data describing asynchronous work ("call the identity
//! provider with these credentials"). The executor runs each one on its own
//! task and delivers the single event it produces back through the machine's
//! queue, where it is serialized with every other stimulus.

mod context;
mod executor;
mod handler;

pub use context::{EffectContext, EffectId};
pub(crate) use executor::EffectExecutor;
pub use handler::EffectHandler;
