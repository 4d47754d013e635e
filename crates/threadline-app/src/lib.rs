//! Threadline controllers.
//!
//! This crate wires the pure domain logic of `threadline-core` into the
//! stateful controllers a UI surface drives: the registry service holding the
//! conversation list, the creation coordinator, the message exchange
//! pipeline, and the one-shot username bootstrap. Everything takes its
//! collaborators (backend, feed, identity) by constructor injection.

pub mod bootstrap;
pub mod coordinator;
pub mod exchange;
pub mod registry_service;
pub mod view;

pub use bootstrap::UsernameBootstrap;
pub use coordinator::ConversationCoordinator;
pub use exchange::{COMPLETION_ERROR_TEXT, ExchangePhase, MessageExchange};
pub use registry_service::RegistryService;
pub use view::{Location, ViewEvent, ViewState};

#[cfg(test)]
pub(crate) mod test_support;
