//! Domain events and their in-process distribution.
//!
//! Stock movements, delivery approvals and purchases are described as
//! immutable events; committed events are wrapped in an [`EventEnvelope`] and
//! fanned out through an [`EventBus`].

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
