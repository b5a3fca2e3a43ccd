//! State-machine orchestration engine for multi-step sign-in flows.
//!
//! Authflow drives asynchronous authentication workflows (username/password,
//! hosted-UI redirect, challenge/response) to completion while staying safe
//! under concurrent stimuli: network responses, user cancellation, and
//! redundant duplicate calls.
//!
//! - **Pure functional core** — [`Resolver::resolve`] is deterministic with
//!   no side effects
//! - **Serialized transitions** — one loop applies events in arrival order;
//!   resolvers never need locks
//! - **Async effects** — side effects are data; the executor runs them
//!   concurrently and feeds each completion back in as an ordinary event
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         StateMachine<R>                              │
//! │                                                                      │
//! │   1. Dequeue next event (FIFO, single writer)                        │
//! │   2. resolve(state, event) → next state + effects + timers           │
//! │   3. Commit next state before any effect runs                        │
//! │   4. Notify listeners synchronously, in registration order           │
//! │   5. Hand effects to the executor (one task each, no waiting)        │
//! │   6. Effect completions re-enter through send()                      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use authflow::signin::{self, Credentials, SignInOperation, SignInRequest};
//! use authflow::{FlowConfig, Hub};
//!
//! let machine = signin::sign_in_machine(FlowConfig::default(), provider);
//! machine.start();
//!
//! let operation = SignInOperation::new(
//!     machine.clone(),
//!     Hub::default(),
//!     SignInRequest::Password {
//!         credentials: Credentials::new("alice", "hunter2"),
//!     },
//! );
//! operation.start();
//! let session = operation.outcome().await?;
//! ```
//!
//! # Design Documentation
//!
//! See `DESIGN.md` for architectural decisions.

mod config;
pub mod effect;
mod error;
mod hub;
mod introspection;
mod machine;
mod resolver;
pub mod signin;
mod timer;

pub use config::FlowConfig;
pub use effect::{EffectContext, EffectHandler, EffectId};
pub use error::AuthError;
pub use hub::{Hub, HubPayload, HubToken};
pub use introspection::{FieldValue, StateInfo};
pub use machine::{ListenerToken, StateMachine, StateMachineBuilder};
pub use resolver::{MachineEvent, MachineState, Resolution, Resolver, Transition};
pub use timer::Timer;
