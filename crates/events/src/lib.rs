//! Queue lifecycle signals and the bus that carries them.
//!
//! The queue system publishes a [`JobLifecycleEvent`] for every phase of a job
//! execution. The monitor subscribes explicitly at startup; nothing here holds
//! global state.

pub mod bus;
pub mod in_memory_bus;
pub mod lifecycle;

pub use bus::{Delivery, EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use lifecycle::JobLifecycleEvent;
